//! Client session for an OpenLava web server.
//!
//! Handles login, CSRF tokens, Referer chaining and decoding of the
//! `{status, message, data}` response envelope into payloads or typed errors.

pub mod config;
pub mod envelope;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod path;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use error::{Error, RemoteErrorKind, Result};
#[cfg(any(test, feature = "testing"))]
pub use mock::{MockTransport, RecordedRequest};
pub use path::ApiPath;
pub use reqwest::Method;
pub use session::Session;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
