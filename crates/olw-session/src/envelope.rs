//! Response envelope decoding.
//!
//! Every API response is `{"status": ..., "message": ..., "data": ...}`. A
//! successful envelope yields `data`; anything else becomes an [`Error`].

use crate::error::{Error, RemoteErrorKind};
use camino::Utf8PathBuf;
use reqwest::StatusCode;
use serde_json::Value;
use std::io::Write;

const STATUS_OK: &str = "OK";
const REQUIRED_FIELDS: [&str; 3] = ["status", "message", "data"];

/// Decode the body of a 2xx response and return its `data` payload.
pub fn decode_success(body: &[u8]) -> Result<Value, Error> {
    let value: Value = serde_json::from_slice(body).map_err(Error::NotJson)?;
    let Value::Object(mut envelope) = value else {
        return Err(Error::Shape("response envelope is not a JSON object".to_string()));
    };

    for field in REQUIRED_FIELDS {
        if !envelope.contains_key(field) {
            return Err(Error::MissingField(field));
        }
    }

    if envelope.get("status").and_then(Value::as_str) != Some(STATUS_OK) {
        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = envelope
            .get("data")
            .and_then(exception_class)
            .map(RemoteErrorKind::from_exception_class)
            .unwrap_or(RemoteErrorKind::RemoteServer);
        tracing::debug!(%kind, %message, "server reported failure");
        return Err(Error::remote(kind, message));
    }

    Ok(envelope.remove("data").unwrap_or(Value::Null))
}

/// Map a non-2xx response to an error.
///
/// `authenticated` is the session state at the time of the call; it decides
/// how a bare 403 is reported.
pub fn decode_failure(status: StatusCode, url: &str, body: &[u8], authenticated: bool) -> Error {
    let expected = matches!(status.as_u16(), 400 | 401 | 403 | 404 | 500);
    if !expected {
        return Error::Http {
            status: status.as_u16(),
            url: url.to_string(),
        };
    }

    if let Some(err) = parse_error_body(body) {
        return err;
    }

    tracing::debug!(status = status.as_u16(), url, "error body was not parsable");
    match status.as_u16() {
        400 => Error::remote(RemoteErrorKind::RemoteServer, "Bad request"),
        401 => Error::remote(
            RemoteErrorKind::Authentication,
            "Unknown authentication failure, check server logs",
        ),
        403 if authenticated => Error::remote(RemoteErrorKind::PermissionDenied, "Access denied"),
        403 => Error::remote(
            RemoteErrorKind::Authentication,
            "Unknown authentication failure, check server logs",
        ),
        404 => Error::remote(
            RemoteErrorKind::RemoteServer,
            "Invalid server URL, or misconfigured web server",
        ),
        _ => server_error(body),
    }
}

/// Parse an error body carrying an exception class and/or message.
fn parse_error_body(body: &[u8]) -> Option<Error> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;
    let data = object.get("data");

    let class = data.and_then(exception_class);
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .or_else(|| data.and_then(|d| d.get("message")).and_then(Value::as_str));

    if class.is_none() && message.is_none() {
        return None;
    }

    let kind = class
        .map(RemoteErrorKind::from_exception_class)
        .unwrap_or(RemoteErrorKind::RemoteServer);
    Some(Error::remote(kind, message.unwrap_or_default()))
}

fn exception_class(data: &Value) -> Option<&str> {
    data.get("exception_class").and_then(Value::as_str)
}

/// Keep an unparsable 500 body on disk and point the error at it.
fn server_error(body: &[u8]) -> Error {
    match keep_artifact(body) {
        Ok(path) => {
            tracing::warn!(%path, "server returned error 500");
            Error::Remote {
                kind: RemoteErrorKind::RemoteServer,
                message: format!("Server returned error 500, output stored in: {path}"),
                artifact: Some(path),
            }
        }
        Err(e) => Error::remote(
            RemoteErrorKind::RemoteServer,
            format!("Server returned error 500, output could not be stored: {e}"),
        ),
    }
}

fn keep_artifact(body: &[u8]) -> std::io::Result<Utf8PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("olw-error-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(body)?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Utf8PathBuf::from_path_buf(path).map_err(|p| {
        std::io::Error::other(format!("non UTF-8 path: {}", p.display()))
    })
}
