//! API paths built from segments.

use std::fmt;

/// A path below the server base URL, kept as unescaped segments.
///
/// Fixed routes come from string literals (`"/hosts"`, `"/queues/"`); names
/// that come from users or the server are added with [`ApiPath::join`] so a
/// `/` or `?` inside them can never change which endpoint is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath {
    segments: Vec<String>,
    trailing_slash: bool,
}

impl ApiPath {
    /// Split a fixed route on `/`. A trailing slash is kept until a segment
    /// is joined.
    pub fn new(route: &str) -> Self {
        let route = route.trim_start_matches('/');
        let trailing_slash = route.ends_with('/');
        Self {
            segments: route
                .trim_end_matches('/')
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            trailing_slash,
        }
    }

    /// Append one segment, taken literally.
    pub fn join(mut self, segment: impl fmt::Display) -> Self {
        self.segments.push(segment.to_string());
        self.trailing_slash = false;
        self
    }

    /// Segments to send, with an empty last one for a trailing slash.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .map(String::as_str)
            .chain(self.trailing_slash.then_some(""))
    }

    /// The segment that cannot be sent, if any: empty, `.` or `..`.
    pub(crate) fn invalid_segment(&self) -> Option<&str> {
        self.segments
            .iter()
            .map(String::as_str)
            .find(|s| matches!(*s, "" | "." | ".."))
    }
}

impl From<&str> for ApiPath {
    fn from(route: &str) -> Self {
        Self::new(route)
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))?;
        if self.trailing_slash {
            f.write_str("/")?;
        }
        Ok(())
    }
}
