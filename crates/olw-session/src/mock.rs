//! In-memory transport with scripted responses.
//!
//! Used by the tests of every crate in the workspace to drive a [`Session`]
//! without a server. Built for this crate's tests and, through the `testing`
//! feature, for the tests of crates that depend on it. Routes are matched on method and URL path, the most
//! recently added route winning; each request is recorded so tests can assert
//! on headers, query strings and bodies.
//!
//! [`Session`]: crate::Session

use crate::error::Result;
use crate::session::{CSRF_TOKEN_PATH, LOGIN_PATH, SESSION_COOKIE};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    /// Body parsed as JSON, if any.
    pub fn json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }

    /// Value of a query parameter.
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    path: String,
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
    sets_cookie: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<RecordedRequest>,
    cookies: HashSet<String>,
}

/// Scripted transport. Clones share the same routes and request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that accepts any login and hands out a CSRF token.
    pub fn with_login() -> Self {
        let mock = Self::new();
        mock.on_login_success();
        mock
    }

    /// Respond to `method path` with a JSON body.
    pub fn on(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.push(Route {
            method,
            path: path.to_string(),
            status: status_code(status),
            content_type: Some("application/json".to_string()),
            body: body.to_string().into_bytes(),
            sets_cookie: None,
        })
    }

    /// Respond to `method path` with an `{"status":"OK"}` envelope around `data`.
    pub fn on_ok(&self, method: Method, path: &str, data: Value) -> &Self {
        self.on(
            method,
            path,
            200,
            json!({"status": "OK", "message": "", "data": data}),
        )
    }

    /// Respond with raw bytes and an explicit content type.
    pub fn on_raw(
        &self,
        method: Method,
        path: &str,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
    ) -> &Self {
        self.push(Route {
            method,
            path: path.to_string(),
            status: status_code(status),
            content_type: content_type.map(str::to_owned),
            body: body.to_vec(),
            sets_cookie: None,
        })
    }

    /// Login succeeds and sets the session cookie; token endpoint answers.
    pub fn on_login_success(&self) -> &Self {
        self.push(Route {
            method: Method::POST,
            path: LOGIN_PATH.to_string(),
            status: StatusCode::OK,
            content_type: Some("application/json".to_string()),
            body: serde_json::to_vec(&json!({
                "status": "OK",
                "message": "Logged in",
                "data": {}
            }))
            .unwrap_or_default(),
            sets_cookie: Some(SESSION_COOKIE.to_string()),
        });
        self.on_ok(Method::GET, CSRF_TOKEN_PATH, json!({"cookie": "csrf-token-1"}))
    }

    /// Login answers 200 but sets no session cookie.
    pub fn on_login_rejected(&self, description: &str) -> &Self {
        self.on(
            Method::POST,
            LOGIN_PATH,
            200,
            json!({"status": "FAIL", "description": description}),
        )
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }

    /// Requests whose URL path equals `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|r| r.url.path() == path)
            .cloned()
            .collect()
    }

    /// Number of login attempts seen.
    pub fn login_count(&self) -> usize {
        self.requests_to(LOGIN_PATH).len()
    }

    /// Drop all cookies, as if the server session expired.
    pub fn clear_cookies(&self) {
        self.state.borrow_mut().cookies.clear();
    }

    fn push(&self, route: Route) -> &Self {
        self.state.borrow_mut().routes.push(route);
        self
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state.borrow_mut();
        state.requests.push(RecordedRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });

        let route = state
            .routes
            .iter()
            .rev()
            .find(|r| r.method == request.method && r.path == request.url.path())
            .cloned();

        match route {
            Some(route) => {
                if let Some(cookie) = route.sets_cookie {
                    state.cookies.insert(cookie);
                }
                Ok(HttpResponse {
                    status: route.status,
                    content_type: route.content_type,
                    body: route.body,
                })
            }
            None => Ok(HttpResponse {
                status: StatusCode::NOT_FOUND,
                content_type: Some("text/html".to_string()),
                body: b"<h1>Not Found</h1>".to_vec(),
            }),
        }
    }

    fn has_cookie(&self, name: &str) -> bool {
        self.state.borrow().cookies.contains(name)
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
