//! HTTP transport used by the session.
//!
//! The session never talks to `reqwest` directly; it goes through the
//! [`Transport`] trait so the wire can be swapped for [`crate::MockTransport`].

use crate::config::SessionConfig;
use crate::error::Result;
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, StatusCode, Url};
use std::sync::Arc;

/// A fully built request, headers included.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Raw response: status, content type and the full body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Blocking request/response channel with a cookie jar.
pub trait Transport {
    /// Send a request and read the whole response.
    ///
    /// Non-2xx statuses are returned as responses, not errors. Only
    /// network-level faults are errors.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Whether the cookie jar holds a cookie with this name for the server.
    fn has_cookie(&self, name: &str) -> bool;
}

/// `reqwest` blocking client with an in-memory cookie jar.
pub struct HttpTransport {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url: config.url()?,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }

    fn has_cookie(&self, name: &str) -> bool {
        self.jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().map(|s| cookie_header_has(s, name)).ok())
            .unwrap_or(false)
    }
}

/// Check a `Cookie:` header value (`a=1; b=2`) for a cookie name.
pub(crate) fn cookie_header_has(header: &str, name: &str) -> bool {
    header
        .split(';')
        .filter_map(|pair| pair.split('=').next())
        .any(|key| key.trim() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_has() {
        assert!(cookie_header_has("csrftoken=abc; sessionid=xyz", "sessionid"));
        assert!(cookie_header_has("sessionid=xyz", "sessionid"));
        assert!(!cookie_header_has("csrftoken=abc", "sessionid"));
        assert!(!cookie_header_has("", "sessionid"));
        assert!(!cookie_header_has("xsessionid=1", "sessionid"));
    }

    #[test]
    fn test_http_transport_starts_without_session_cookie() {
        let config = SessionConfig::new("http://cluster.example:8080/", None, None).unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        assert!(!transport.has_cookie("sessionid"));
    }
}
