//! Authenticated session with the cluster web server.
//!
//! A session logs in lazily on the first call, keeps the CSRF token it is
//! handed, and sends each request with the previous request's URL as Referer.
//! It is single-threaded: state lives in a `RefCell`, so share it by reference
//! within one thread and give each worker its own session.

use crate::config::SessionConfig;
use crate::envelope;
use crate::error::{Error, RemoteErrorKind, Result};
use crate::path::ApiPath;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::{Value, json};
use std::cell::RefCell;

pub(crate) const LOGIN_PATH: &str = "/accounts/ajax_login";
pub(crate) const CSRF_TOKEN_PATH: &str = "/get_token";
pub(crate) const SESSION_COOKIE: &str = "sessionid";

const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrftoken");
const XHR_HEADER: HeaderName = HeaderName::from_static("x-requested-with");
const XHR_META_HEADER: HeaderName = HeaderName::from_static("http_x_requested_with");
const XHR_VALUE: &str = "XMLHttpRequest";

/// Mutable per-session state. Only `login` and `call` touch it.
#[derive(Debug, Default)]
struct SessionState {
    csrf_token: Option<String>,
    referer: Option<String>,
}

pub struct Session {
    config: SessionConfig,
    transport: Box<dyn Transport>,
    state: RefCell<SessionState>,
}

impl Session {
    /// Build a session over HTTP. No request is made until the first call.
    pub fn configure(config: SessionConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Box::new(transport)))
    }

    /// Build a session over any transport.
    pub fn with_transport(config: SessionConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            state: RefCell::new(SessionState::default()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Base URL of the server, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// True when the cookie jar holds a session cookie.
    pub fn authenticated(&self) -> bool {
        self.transport.has_cookie(SESSION_COOKIE)
    }

    /// CSRF token obtained by the last successful login.
    pub fn csrf_token(&self) -> Option<String> {
        self.state.borrow().csrf_token.clone()
    }

    /// GET `path` and return the decoded payload.
    pub fn get(&self, path: impl Into<ApiPath>) -> Result<Value> {
        self.call(Method::GET, path, &[], None)
    }

    /// GET `path` with query parameters.
    pub fn get_with_query(&self, path: impl Into<ApiPath>, query: &[(&str, String)]) -> Result<Value> {
        self.call(Method::GET, path, query, None)
    }

    /// POST `path` with an optional JSON body.
    pub fn post(&self, path: impl Into<ApiPath>, body: Option<&Value>) -> Result<Value> {
        self.call(Method::POST, path, &[], body)
    }

    /// Perform an API call, logging in first if needed.
    ///
    /// Returns the `data` of a successful envelope, or the error the server
    /// response maps to. Nothing is retried.
    pub fn call(
        &self,
        method: Method,
        path: impl Into<ApiPath>,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.config.endpoint(&path.into(), query)?;
        if !self.authenticated() {
            self.login()?;
        }

        let body = body
            .map(|b| serde_json::to_vec(b).map_err(Error::Encode))
            .transpose()?;
        let response = self.send(method, url.clone(), body)?;
        self.decode(&url, response)
    }

    /// Log in with the configured credentials and fetch a CSRF token.
    pub fn login(&self) -> Result<()> {
        let url = self.config.endpoint(&ApiPath::new(LOGIN_PATH), &[])?;
        tracing::debug!(
            username = self.config.username.as_deref().unwrap_or(""),
            "logging in"
        );
        let credentials = json!({
            "username": self.config.username,
            "password": self.config.password,
        });
        let body = serde_json::to_vec(&credentials).map_err(Error::Encode)?;
        let response = self.send(Method::POST, url.clone(), Some(body))?;

        if !response.status.is_success() {
            return Err(envelope::decode_failure(
                response.status,
                url.as_str(),
                &response.body,
                false,
            ));
        }
        if !self.authenticated() {
            let message = login_failure_message(&response.body);
            tracing::debug!(%message, "login rejected");
            return Err(Error::remote(RemoteErrorKind::Authentication, message));
        }

        let token = self.fetch_csrf_token()?;
        self.state.borrow_mut().csrf_token = Some(token);
        tracing::debug!("session authenticated");
        Ok(())
    }

    fn fetch_csrf_token(&self) -> Result<String> {
        let url = self.config.endpoint(&ApiPath::new(CSRF_TOKEN_PATH), &[])?;
        let response = self.send(Method::GET, url.clone(), None)?;
        let data = self.decode(&url, response)?;

        match data {
            Value::String(token) => Ok(token),
            Value::Object(ref map) => map
                .get("cookie")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| Error::Shape(format!("no CSRF token in {data}"))),
            other => Err(Error::Shape(format!("no CSRF token in {other}"))),
        }
    }

    /// Build headers from current state, advance the Referer, and send.
    fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<HttpResponse> {
        let headers = {
            let mut state = self.state.borrow_mut();
            let headers = request_headers(&state);
            state.referer = Some(url.to_string());
            headers
        };

        tracing::debug!(%method, %url, "sending request");
        self.transport.execute(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn decode(&self, url: &Url, response: HttpResponse) -> Result<Value> {
        if !response.status.is_success() {
            return Err(envelope::decode_failure(
                response.status,
                url.as_str(),
                &response.body,
                self.authenticated(),
            ));
        }

        if let Some(content_type) = &response.content_type {
            if !content_type.starts_with("application/json") {
                return Err(Error::ContentType(content_type.clone()));
            }
        }

        envelope::decode_success(&response.body)
    }
}

/// Fresh header set for one request.
fn request_headers(state: &SessionState) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(XHR_HEADER, HeaderValue::from_static(XHR_VALUE));
    headers.insert(XHR_META_HEADER, HeaderValue::from_static(XHR_VALUE));

    if let Some(value) = state
        .referer
        .as_deref()
        .and_then(|r| HeaderValue::from_str(r).ok())
    {
        headers.insert(header::REFERER, value);
    }
    if let Some(value) = state
        .csrf_token
        .as_deref()
        .and_then(|t| HeaderValue::from_str(t).ok())
    {
        headers.insert(CSRF_HEADER, value);
    }

    headers
}

/// Best description of why a login was refused.
fn login_failure_message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let data = value.get("data");
    ["description", "message"]
        .iter()
        .find_map(|key| {
            value
                .get(key)
                .or_else(|| data.and_then(|d| d.get(key)))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("Unable to authenticate")
        .to_string()
}
