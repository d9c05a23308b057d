//! Connection parameters for a session.

use crate::error::{Error, Result};
use crate::path::ApiPath;
use reqwest::Url;
use std::time::Duration;

/// Connection parameters for one cluster.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server base URL, without trailing slash
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout applied by the HTTP transport (none by default)
    pub timeout: Option<Duration>,
}

impl SessionConfig {
    /// Validate the base URL and build a config.
    ///
    /// The URL must be absolute `http` or `https` with a host. Trailing
    /// slashes are stripped.
    pub fn new(
        base_url: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidUrl {
                url: base_url.to_string(),
                reason: "URL is empty".to_string(),
            });
        }

        let url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::InvalidUrl {
                url: base_url.to_string(),
                reason: "URL has no host".to_string(),
            });
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            username,
            password,
            timeout: None,
        })
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parsed base URL.
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| Error::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Absolute URL for an API path, with query pairs appended.
    ///
    /// Each segment is percent-encoded on its own; `.` and `..` segments are
    /// refused rather than resolved.
    pub fn endpoint(&self, path: &ApiPath, query: &[(&str, String)]) -> Result<Url> {
        if let Some(segment) = path.invalid_segment() {
            return Err(Error::InvalidArgument(format!(
                "invalid path segment {segment:?} in {path}"
            )));
        }
        let mut url = self.url()?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                url: self.base_url.clone(),
                reason: "URL cannot have a path".to_string(),
            })?
            .pop_if_empty()
            .extend(path.segments());
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = SessionConfig::new("https://cluster.example/olw///", None, None).unwrap();
        assert_eq!(config.base_url, "https://cluster.example/olw");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        assert!(matches!(
            SessionConfig::new("", None, None),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(
            SessionConfig::new("   /", None, None),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(
            SessionConfig::new("cluster.example", None, None),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(
            SessionConfig::new("ftp://cluster.example", None, None),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_endpoint_appends_query() {
        let config = SessionConfig::new("http://cluster.example", None, None).unwrap();
        let url = config
            .endpoint(&ApiPath::new("/jobs/"), &[("queue_name", "normal".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "http://cluster.example/jobs/?queue_name=normal");

        let url = config.endpoint(&ApiPath::new("/hosts"), &[]).unwrap();
        assert_eq!(url.as_str(), "http://cluster.example/hosts");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = SessionConfig::new("https://cluster.example/olw/", None, None).unwrap();
        let url = config.endpoint(&ApiPath::new("/users/").join("alice"), &[]).unwrap();
        assert_eq!(url.as_str(), "https://cluster.example/olw/users/alice");
    }

    #[test]
    fn test_endpoint_escapes_names() {
        let config = SessionConfig::new("http://cluster.example", None, None).unwrap();

        let url = config
            .endpoint(&ApiPath::new("/hosts").join("x?evil=1"), &[("json", "1".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/hosts/x%3Fevil=1");
        assert_eq!(url.query(), Some("json=1"));

        let url = config
            .endpoint(&ApiPath::new("/hosts").join("../queues/normal").join("close"), &[])
            .unwrap();
        assert_eq!(url.path(), "/hosts/..%2Fqueues%2Fnormal/close");
    }

    #[test]
    fn test_endpoint_refuses_dot_segments() {
        let config = SessionConfig::new("http://cluster.example", None, None).unwrap();
        for name in ["..", ".", ""] {
            let path = ApiPath::new("/hosts").join(name).join("close");
            assert!(matches!(
                config.endpoint(&path, &[]),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_with_timeout() {
        let config = SessionConfig::new("http://cluster.example", None, None)
            .unwrap()
            .with_timeout(Duration::from_secs(30));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }
}
