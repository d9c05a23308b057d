use crate::hydrate::{Bound, Entity};
use olw_session::{ApiPath, Result, Session};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A cluster user and their slot usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub max_jobs: Option<i64>,
    #[serde(default)]
    pub max_slots: Option<i64>,
    #[serde(default)]
    pub max_slots_per_processor: Option<f64>,
    #[serde(default)]
    pub total_jobs: Option<i64>,
    #[serde(default)]
    pub total_slots: Option<i64>,
    #[serde(default)]
    pub num_pending_slots: Option<i64>,
    #[serde(default)]
    pub num_running_slots: Option<i64>,
    #[serde(default)]
    pub num_system_suspended_slots: Option<i64>,
    #[serde(default)]
    pub num_user_suspended_slots: Option<i64>,
    #[serde(default)]
    pub num_reserved_slots: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for User {
    const KIND: &'static str = "User";
    const TYPE_NAMES: &'static [&'static str] = &["User"];
}

impl User {
    pub fn list(session: &Session) -> Result<Vec<Bound<'_, User>>> {
        let data = session.get("/users/")?;
        Bound::hydrate_list(session, data)
    }

    pub fn fetch<'s>(session: &'s Session, name: &str) -> Result<Bound<'s, User>> {
        let data = session.get(ApiPath::new("/users").join(name))?;
        Bound::hydrate(session, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_with;
    use olw_session::{Method, MockTransport, RemoteErrorKind};
    use serde_json::json;

    #[test]
    fn test_list_users() {
        let mock = MockTransport::with_login();
        mock.on_ok(
            Method::GET,
            "/users/",
            json!([
                {"type": "User", "name": "alice", "max_slots": 10, "total_slots": 3, "num_running_slots": 2},
                {"type": "User", "name": "bob", "max_slots": null}
            ]),
        );
        let session = session_with(&mock);

        let users = User::list(&session).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].num_running_slots, Some(2));
        assert_eq!(users[1].max_slots, None);
    }

    #[test]
    fn test_fetch_missing_user() {
        let mock = MockTransport::with_login();
        mock.on(
            Method::GET,
            "/users/nobody",
            404,
            json!({"status": "FAIL", "message": "No such user: nobody", "data": {"exception_class": "NoSuchUserError"}}),
        );
        let session = session_with(&mock);

        let err = User::fetch(&session, "nobody").unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::NoSuchUser));
        assert_eq!(err.remote_message(), Some("No such user: nobody"));
    }
}
