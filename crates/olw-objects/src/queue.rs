use crate::host::join_statuses;
use crate::hydrate::{Bound, Entity, nullable};
use crate::records::{ResourceLimit, Status};
use olw_session::{ApiPath, Result, Session};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A scheduler queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub nice: Option<i64>,
    /// Users allowed to submit. `None` or empty means everyone.
    #[serde(default)]
    pub allowed_users: Option<Vec<String>>,
    /// Hosts jobs may run on. `None` or empty means every host.
    #[serde(default)]
    pub allowed_hosts: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub admins: Vec<String>,
    #[serde(default)]
    pub max_jobs: Option<i64>,
    #[serde(default)]
    pub max_slots: Option<i64>,
    #[serde(default)]
    pub max_slots_per_user: Option<i64>,
    #[serde(default)]
    pub max_slots_per_host: Option<i64>,
    #[serde(default)]
    pub max_slots_per_processor: Option<f64>,
    #[serde(default)]
    pub total_slots: Option<i64>,
    #[serde(default)]
    pub num_pending_slots: Option<i64>,
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
    #[serde(default)]
    pub accept_interval: Option<i64>,
    #[serde(default)]
    pub is_accepting_jobs: Option<bool>,
    #[serde(default)]
    pub is_dispatching_jobs: Option<bool>,
    #[serde(default)]
    pub run_windows: Option<String>,
    #[serde(default)]
    pub dispatch_windows: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub statuses: Vec<Status>,
    #[serde(default, deserialize_with = "nullable")]
    pub attributes: Vec<Status>,
    #[serde(default, deserialize_with = "nullable")]
    pub runtime_limits: Vec<ResourceLimit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Queue {
    const KIND: &'static str = "Queue";
    const TYPE_NAMES: &'static [&'static str] = &["Queue"];
}

/// Client side restriction of a queue listing.
///
/// A queue passes when its `allowed_users`/`allowed_hosts` admit the
/// requested user/host. The keyword `all` only admits unrestricted queues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueFilter {
    pub user: Option<String>,
    pub host: Option<String>,
}

impl QueueFilter {
    pub fn matches(&self, queue: &Queue) -> bool {
        admits(queue.allowed_users.as_deref(), self.user.as_deref())
            && admits(queue.allowed_hosts.as_deref(), self.host.as_deref())
    }
}

fn admits(allowed: Option<&[String]>, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    match allowed {
        None | Some([]) => true,
        Some(list) => wanted != "all" && list.iter().any(|a| a == wanted),
    }
}

impl Queue {
    pub fn status_summary(&self) -> String {
        join_statuses(&self.statuses)
    }

    pub fn list(session: &Session) -> Result<Vec<Bound<'_, Queue>>> {
        let data = session.get("/queues/")?;
        Bound::hydrate_list(session, data)
    }

    /// List queues and keep those passing `filter`.
    pub fn list_matching<'s>(
        session: &'s Session,
        filter: &QueueFilter,
    ) -> Result<Vec<Bound<'s, Queue>>> {
        let mut queues = Self::list(session)?;
        queues.retain(|q| filter.matches(q));
        Ok(queues)
    }

    pub fn fetch<'s>(session: &'s Session, name: &str) -> Result<Bound<'s, Queue>> {
        let data = session.get(ApiPath::new("/queues").join(name))?;
        Bound::hydrate(session, data)
    }
}

impl Bound<'_, Queue> {
    /// Let the queue accept new jobs.
    pub fn open(&self) -> Result<()> {
        self.action("open")
    }

    /// Stop accepting new jobs.
    pub fn close(&self) -> Result<()> {
        self.action("close")
    }

    /// Resume dispatching jobs.
    pub fn activate(&self) -> Result<()> {
        self.action("activate")
    }

    /// Stop dispatching jobs.
    pub fn inactivate(&self) -> Result<()> {
        self.action("inactivate")
    }

    fn action(&self, action: &str) -> Result<()> {
        tracing::debug!(queue = %self.name, action, "queue action");
        let path = ApiPath::new("/queues").join(&self.name).join(action);
        self.session().post(path, None)?;
        Ok(())
    }
}
