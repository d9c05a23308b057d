use crate::hydrate::{Bound, Entity, nullable};
use crate::records::{LoadInformation, Resource, Status};
use olw_session::{ApiPath, Result, Session};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A host in the cluster.
///
/// Scalars the server may send as null are `Option`s, so a record re-encodes
/// to the values it was decoded from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub host_model: Option<String>,
    #[serde(default)]
    pub host_type: Option<String>,
    #[serde(default)]
    pub cpu_factor: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub admins: Vec<String>,
    #[serde(default)]
    pub run_windows: Option<String>,
    #[serde(default)]
    pub max_jobs: Option<i64>,
    #[serde(default)]
    pub max_processors: Option<i64>,
    #[serde(default)]
    pub max_slots: Option<i64>,
    #[serde(default)]
    pub max_slots_per_user: Option<i64>,
    #[serde(default)]
    pub total_jobs: Option<i64>,
    #[serde(default)]
    pub total_slots: Option<i64>,
    #[serde(default)]
    pub num_running_slots: Option<i64>,
    #[serde(default)]
    pub num_suspended_slots: Option<i64>,
    #[serde(default)]
    pub num_system_suspended_slots: Option<i64>,
    #[serde(default)]
    pub num_user_suspended_slots: Option<i64>,
    #[serde(default)]
    pub num_reserved_slots: Option<i64>,
    /// Slots allocated to a job, set on execution hosts only.
    #[serde(default)]
    pub num_slots: Option<i64>,
    #[serde(default)]
    pub is_busy: Option<bool>,
    #[serde(default)]
    pub is_closed: Option<bool>,
    #[serde(default)]
    pub is_down: Option<bool>,
    #[serde(default)]
    pub is_server: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub statuses: Vec<Status>,
    #[serde(default, deserialize_with = "nullable")]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub load_information: Option<LoadInformation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Host {
    const KIND: &'static str = "Host";
    const TYPE_NAMES: &'static [&'static str] = &["Host", "ExecutionHost"];
}

impl Host {
    /// Name used to address the host on the server.
    pub fn hostname(&self) -> &str {
        self.host_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }

    /// Comma separated friendly status names.
    pub fn status_summary(&self) -> String {
        join_statuses(&self.statuses)
    }

    /// Every host in the cluster.
    pub fn list(session: &Session) -> Result<Vec<Bound<'_, Host>>> {
        let data = session.get("/hosts")?;
        Bound::hydrate_list(session, data)
    }

    pub fn fetch<'s>(session: &'s Session, name: &str) -> Result<Bound<'s, Host>> {
        let path = ApiPath::new("/hosts").join(name);
        let data = session.get_with_query(path, &[("json", "1".to_string())])?;
        Bound::hydrate(session, data)
    }
}

impl Bound<'_, Host> {
    /// Open the host for dispatch. Opening an open host is not an error.
    pub fn open(&self) -> Result<()> {
        self.action("open")
    }

    /// Close the host to new jobs.
    pub fn close(&self) -> Result<()> {
        self.action("close")
    }

    fn action(&self, action: &str) -> Result<()> {
        tracing::debug!(host = self.hostname(), action, "host action");
        let path = ApiPath::new("/hosts").join(self.hostname()).join(action);
        self.session().post(path, None)?;
        Ok(())
    }
}

pub(crate) fn join_statuses(statuses: &[Status]) -> String {
    statuses
        .iter()
        .map(|s| s.friendly.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_with;
    use olw_session::{Error, Method, MockTransport, RemoteErrorKind};
    use serde_json::json;

    fn host_json(name: &str) -> Value {
        json!({
            "type": "Host",
            "name": name,
            "host_name": name,
            "max_slots": 8,
            "max_slots_per_user": 2147483647,
            "cpu_factor": 100.0,
            "is_closed": false,
            "statuses": [{"name": "HOST_STAT_OK", "friendly": "ok", "description": "", "status": 0}],
            "resources": [{"name": "linux", "description": "Linux", "flags": [], "interval": 0}],
            "load_information": {
                "short_names": ["r15s"],
                "names": ["15s Load"],
                "values": [{"name": "Total", "values": [0.1]}]
            },
            "max_swap": 4096
        })
    }

    #[test]
    fn test_list_hosts() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts", json!([host_json("node1"), host_json("node2")]));
        let session = session_with(&mock);

        let hosts = Host::list(&session).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[1].hostname(), "node2");
        assert_eq!(hosts[0].status_summary(), "ok");
        assert_eq!(hosts[0].resources[0].name, "linux");
        assert_eq!(hosts[0].extra.get("max_swap"), Some(&json!(4096)));
    }

    #[test]
    fn test_list_hosts_rejects_non_list() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts", host_json("node1"));
        let session = session_with(&mock);

        assert!(matches!(Host::list(&session), Err(Error::Shape(_))));
    }

    #[test]
    fn test_fetch_host_sends_json_flag() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts/node1", host_json("node1"));
        let session = session_with(&mock);

        let host = Host::fetch(&session, "node1").unwrap();
        assert_eq!(host.max_slots, Some(8));
        let sent = mock.requests_to("/hosts/node1");
        assert_eq!(sent[0].query("json").as_deref(), Some("1"));
    }

    #[test]
    fn test_fetch_missing_host() {
        let mock = MockTransport::with_login();
        mock.on(
            Method::GET,
            "/hosts/ghost",
            404,
            json!({"status": "FAIL", "message": "No such host: ghost", "data": {"exception_class": "NoSuchHostError"}}),
        );
        let session = session_with(&mock);

        let err = Host::fetch(&session, "ghost").unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::NoSuchHost));
    }

    #[test]
    fn test_close_permission_denied() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts/node1", host_json("node1"));
        mock.on(
            Method::POST,
            "/hosts/node1/close",
            403,
            json!({"data": {"exception_class": "PermissionDeniedError", "message": "denied"}}),
        );
        let session = session_with(&mock);

        let host = Host::fetch(&session, "node1").unwrap();
        let err = host.close().unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
        assert_eq!(err.remote_message(), Some("denied"));
    }

    #[test]
    fn test_open_is_idempotent() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts/node1", host_json("node1"));
        mock.on_ok(Method::POST, "/hosts/node1/open", Value::Null);
        let session = session_with(&mock);

        let host = Host::fetch(&session, "node1").unwrap();
        host.open().unwrap();
        host.open().unwrap();

        let sent = mock.requests_to("/hosts/node1/open");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].url, sent[1].url);
        assert_eq!(sent[0].body, sent[1].body);
    }

    #[test]
    fn test_hostname_falls_back_to_name() {
        let host = crate::hydrate::hydrate::<Host>(json!({"type": "ExecutionHost", "name": "node3"}))
            .unwrap();
        assert_eq!(host.hostname(), "node3");
    }

    #[test]
    fn test_round_trip_keeps_scalar_fields() {
        let mut original = host_json("node1");
        let extra = json!({
            "description": null,
            "host_model": null,
            "run_windows": "",
            "is_closed": null,
            "is_down": true,
            "max_jobs": null
        });
        for (key, value) in extra.as_object().unwrap() {
            original[key] = value.clone();
        }

        let host: Host = crate::hydrate::hydrate(original.clone()).unwrap();
        assert_eq!(host.description, None);
        assert_eq!(host.run_windows.as_deref(), Some(""));
        let encoded = serde_json::to_value(&host).unwrap();
        let again: Host = crate::hydrate::hydrate(encoded.clone()).unwrap();
        assert_eq!(again, host);

        for (key, value) in original.as_object().unwrap() {
            if value.is_array() || value.is_object() {
                continue;
            }
            assert_eq!(encoded.get(key), Some(value), "{key}");
        }
    }

    #[test]
    fn test_names_are_escaped_in_paths() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts/x%3Fevil=1", host_json("x?evil=1"));
        mock.on_ok(Method::POST, "/hosts/..%2Fqueues%2Fnormal/close", Value::Null);
        mock.on_ok(Method::POST, "/queues/normal/close", Value::Null);
        let session = session_with(&mock);

        let host = Host::fetch(&session, "x?evil=1").unwrap();
        assert_eq!(host.hostname(), "x?evil=1");
        let sent = &mock.requests_to("/hosts/x%3Fevil=1")[0];
        assert_eq!(sent.url.query(), Some("json=1"));

        let host = Bound::new(
            &session,
            crate::hydrate::hydrate::<Host>(host_json("../queues/normal")).unwrap(),
        );
        host.close().unwrap();
        assert_eq!(mock.requests_to("/hosts/..%2Fqueues%2Fnormal/close").len(), 1);
        assert!(mock.requests_to("/queues/normal/close").is_empty());
    }

    #[test]
    fn test_dot_names_are_refused() {
        let mock = MockTransport::with_login();
        let session = session_with(&mock);

        let err = Host::fetch(&session, "..").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(mock.requests().is_empty());
    }
}
