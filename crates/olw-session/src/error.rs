//! Error taxonomy for remote cluster operations.

use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Kind of failure reported by the remote server.
///
/// The server names its failures with an `exception_class` string; this is the
/// closed set of names the client knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// Credentials rejected, or no session cookie after login
    Authentication,
    /// Authenticated but not allowed to perform the operation
    PermissionDenied,
    NoSuchHost,
    NoSuchJob,
    NoSuchQueue,
    NoSuchUser,
    /// Referenced resource does not exist
    ResourceDoesntExist,
    /// Scheduler rejected the submission
    JobSubmit,
    /// Scheduler interface failed on the server side
    ClusterInterface,
    /// Generic remote failure, also used for unknown exception classes
    RemoteServer,
}

/// Exception class names as sent by the server.
const EXCEPTION_CLASSES: &[(&str, RemoteErrorKind)] = &[
    ("AuthenticationError", RemoteErrorKind::Authentication),
    ("PermissionDeniedError", RemoteErrorKind::PermissionDenied),
    ("NoSuchHostError", RemoteErrorKind::NoSuchHost),
    ("NoSuchJobError", RemoteErrorKind::NoSuchJob),
    ("NoSuchQueueError", RemoteErrorKind::NoSuchQueue),
    ("NoSuchUserError", RemoteErrorKind::NoSuchUser),
    ("ResourceDoesntExistError", RemoteErrorKind::ResourceDoesntExist),
    ("JobSubmitError", RemoteErrorKind::JobSubmit),
    ("ClusterInterfaceError", RemoteErrorKind::ClusterInterface),
    ("RemoteServerError", RemoteErrorKind::RemoteServer),
];

impl RemoteErrorKind {
    /// Look up a server-supplied exception class.
    ///
    /// The trailing `Error` suffix is optional. Unknown names map to
    /// [`RemoteErrorKind::RemoteServer`].
    pub fn from_exception_class(name: &str) -> Self {
        let name = name.trim();
        EXCEPTION_CLASSES
            .iter()
            .find(|(class, _)| {
                *class == name || class.strip_suffix("Error") == Some(name)
            })
            .map(|(_, kind)| *kind)
            .unwrap_or(RemoteErrorKind::RemoteServer)
    }

    /// The exception class name the server uses for this kind.
    pub fn exception_class(&self) -> &'static str {
        EXCEPTION_CLASSES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(class, _)| *class)
            .unwrap_or("RemoteServerError")
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.exception_class())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// The remote operation did not succeed.
    #[error("{kind}: {message}")]
    Remote {
        kind: RemoteErrorKind,
        message: String,
        /// Local copy of an unparsable error body, kept for diagnosis
        artifact: Option<Utf8PathBuf>,
    },
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {status} from {url}")]
    Http { status: u16, url: String },
    #[error("Server did not return JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("Response did not contain {0} attribute")]
    MissingField(&'static str),
    #[error("Expected a content type of application/json, got: {0}")]
    ContentType(String),
    #[error("Invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Unexpected data from server: {0}")]
    Shape(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("JSON encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a remote error without a diagnostic artifact.
    pub fn remote(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Error::Remote {
            kind,
            message: message.into(),
            artifact: None,
        }
    }

    /// Remote failure kind, if this error came from the server.
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Error::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True when the server reported the failure.
    pub fn is_remote(&self) -> bool {
        self.remote_kind().is_some()
    }

    /// True for failures raised on this side: bad input or configuration,
    /// or server data that does not have the expected shape.
    ///
    /// Everything else (remote errors, unexpected HTTP statuses, malformed
    /// envelopes, network faults) is a failure of the remote operation and
    /// only affects the request that hit it.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl { .. }
                | Error::Shape(_)
                | Error::InvalidArgument(_)
                | Error::Encode(_)
                | Error::Io(_)
        )
    }

    /// Text to report for a failed operation: the server's message when it
    /// sent one, the error itself otherwise.
    pub fn reason(&self) -> String {
        match self.remote_message() {
            Some(message) => message.to_string(),
            None => self.to_string(),
        }
    }

    /// Server-supplied message for remote errors.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Error::Remote { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_exception_class() {
        assert_eq!(
            RemoteErrorKind::from_exception_class("PermissionDeniedError"),
            RemoteErrorKind::PermissionDenied
        );
        assert_eq!(
            RemoteErrorKind::from_exception_class("NoSuchJob"),
            RemoteErrorKind::NoSuchJob
        );
        assert_eq!(
            RemoteErrorKind::from_exception_class("ResourceDoesntExistError"),
            RemoteErrorKind::ResourceDoesntExist
        );
        assert_eq!(
            RemoteErrorKind::from_exception_class("SomethingElseEntirely"),
            RemoteErrorKind::RemoteServer
        );
        assert_eq!(
            RemoteErrorKind::from_exception_class(""),
            RemoteErrorKind::RemoteServer
        );
    }

    #[test]
    fn test_exception_class_names_round_trip() {
        for (class, kind) in EXCEPTION_CLASSES {
            assert_eq!(kind.exception_class(), *class);
            assert_eq!(RemoteErrorKind::from_exception_class(class), *kind);
        }
    }

    #[test]
    fn test_remote_display_and_accessors() {
        let err = Error::remote(RemoteErrorKind::NoSuchHost, "No such host: node9");
        assert_eq!(err.to_string(), "NoSuchHostError: No such host: node9");
        assert!(err.is_remote());
        assert_eq!(err.remote_message(), Some("No such host: node9"));

        let err = Error::MissingField("status");
        assert!(!err.is_remote());
        assert_eq!(err.remote_kind(), None);
    }

    #[test]
    fn test_only_client_side_failures_are_local() {
        let remote_side = [
            Error::remote(RemoteErrorKind::NoSuchHost, "gone"),
            Error::Http {
                status: 502,
                url: "http://olw.test/hosts/node1/close".to_string(),
            },
            Error::MissingField("data"),
            Error::ContentType("text/html".to_string()),
            Error::NotJson(serde_json::from_str::<serde_json::Value>("<html>").unwrap_err()),
        ];
        for err in &remote_side {
            assert!(!err.is_local(), "{err}");
        }

        let local = [
            Error::Shape("not a list".to_string()),
            Error::InvalidArgument("Argument: x is not valid".to_string()),
            Error::InvalidUrl {
                url: String::new(),
                reason: "URL is empty".to_string(),
            },
        ];
        for err in &local {
            assert!(err.is_local(), "{err}");
        }
    }

    #[test]
    fn test_reason_prefers_server_message() {
        let err = Error::remote(RemoteErrorKind::PermissionDenied, "denied");
        assert_eq!(err.reason(), "denied");

        let err = Error::Http {
            status: 502,
            url: "http://olw.test/hosts".to_string(),
        };
        assert_eq!(err.reason(), "Unexpected HTTP status 502 from http://olw.test/hosts");
    }
}
