//! Jobs: listing, submission and job control.

use crate::host::Host;
use crate::hydrate::{Bound, Entity, nullable};
use crate::queue::Queue;
use crate::records::{ConsumedResource, ExecutionHost, JobOption, NameRef, Process, ResourceLimit, Status};
use chrono::{DateTime, Utc};
use olw_session::{ApiPath, Error, Method, Result, Session};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A job, or one task of a job array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub job_id: u64,
    /// Task index; 0 for jobs that are not arrays.
    #[serde(default)]
    pub array_index: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Status,
    #[serde(default)]
    pub queue: Option<NameRef>,
    #[serde(default)]
    pub submission_host: Option<NameRef>,
    #[serde(default, deserialize_with = "nullable")]
    pub execution_hosts: Vec<ExecutionHost>,
    #[serde(default, deserialize_with = "nullable")]
    pub consumed_resources: Vec<ConsumedResource>,
    #[serde(default, deserialize_with = "nullable")]
    pub options: Vec<JobOption>,
    #[serde(default, deserialize_with = "nullable")]
    pub processes: Vec<Process>,
    #[serde(default, deserialize_with = "nullable")]
    pub runtime_limits: Vec<ResourceLimit>,
    #[serde(default, deserialize_with = "nullable")]
    pub project_names: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub pending_reasons: Option<String>,
    #[serde(default)]
    pub suspension_reasons: Option<String>,
    #[serde(default)]
    pub requested_slots: Option<i64>,
    #[serde(default)]
    pub max_requested_slots: Option<i64>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub cpu_time: Option<f64>,
    /// Epoch seconds.
    #[serde(default)]
    pub submit_time: Option<i64>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Job {
    const KIND: &'static str = "Job";
    const TYPE_NAMES: &'static [&'static str] = &["Job"];
}

/// Job state, from the status name reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done,
    Exit,
    /// Suspended while pending.
    PendingSuspended,
    UserSuspended,
    SystemSuspended,
    Unknown(String),
}

impl JobState {
    /// Parse `JOB_STAT_RUN` style names; the prefix is optional.
    pub fn from_status_name(name: &str) -> Self {
        let upper = name.to_uppercase();
        let code = upper.strip_prefix("JOB_STAT_").unwrap_or(&upper);
        match code {
            "PEND" => JobState::Pending,
            "RUN" => JobState::Running,
            "DONE" => JobState::Done,
            "EXIT" => JobState::Exit,
            "PSUSP" => JobState::PendingSuspended,
            "USUSP" => JobState::UserSuspended,
            "SSUSP" => JobState::SystemSuspended,
            _ => JobState::Unknown(name.to_string()),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            JobState::Pending => "PEND",
            JobState::Running => "RUN",
            JobState::Done => "DONE",
            JobState::Exit => "EXIT",
            JobState::PendingSuspended => "PSUSP",
            JobState::UserSuspended => "USUSP",
            JobState::SystemSuspended => "SSUSP",
            JobState::Unknown(_) => "UNKWN",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Done | JobState::Exit)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which jobs a listing returns, by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobStateFilter {
    /// Pending, running and suspended jobs.
    #[default]
    Active,
    /// Including recently finished jobs.
    All,
    Exit,
    Pending,
    Running,
    Suspended,
}

impl JobStateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStateFilter::Active => "ACT",
            JobStateFilter::All => "ALL",
            JobStateFilter::Exit => "EXIT",
            JobStateFilter::Pending => "PEND",
            JobStateFilter::Running => "RUN",
            JobStateFilter::Suspended => "SUSP",
        }
    }
}

/// Criteria for [`Job::list`]. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Restrict to one job. Other criteria are ignored when set.
    pub job_id: Option<u64>,
    /// With `job_id`, restrict to one task; `None` lists every task.
    pub array_index: Option<u32>,
    pub queue_name: Option<String>,
    pub job_name: Option<String>,
    pub host_name: Option<String>,
    pub job_state: Option<JobStateFilter>,
    /// `all` is the same as no user restriction.
    pub user_name: Option<String>,
}

impl JobFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        let mut push = |key, value: Option<&str>| {
            if let Some(value) = value {
                query.push((key, value.to_string()));
            }
        };
        push("queue_name", self.queue_name.as_deref());
        push("job_name", self.job_name.as_deref());
        push("host_name", self.host_name.as_deref());
        push("job_state", self.job_state.as_ref().map(JobStateFilter::as_str));
        push(
            "user_name",
            self.user_name.as_deref().filter(|user| *user != "all"),
        );
        query
    }
}

/// Field names accepted by [`JobSubmission::from_fields`].
pub const SUBMIT_FIELDS: [&str; 8] = [
    "options",
    "options2",
    "command",
    "requested_slots",
    "max_requested_slots",
    "queue_name",
    "project_name",
    "job_name",
];

/// A job submission request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options2: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_slots: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requested_slots: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
}

impl JobSubmission {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..Self::default()
        }
    }

    /// Build a submission from loose key/value input.
    ///
    /// Keys outside [`SUBMIT_FIELDS`] are rejected by name.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        if let Some(key) = fields.keys().find(|k| !SUBMIT_FIELDS.contains(&k.as_str())) {
            return Err(Error::InvalidArgument(format!("Argument: {key} is not valid")));
        }
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| Error::InvalidArgument(format!("invalid submission: {e}")))
    }
}

/// Options accepted by [`Bound::<Job>::requeue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequeueOptions {
    /// Requeue in held state.
    pub hold: bool,
}

impl RequeueOptions {
    fn query(&self) -> Vec<(&'static str, String)> {
        if self.hold {
            vec![("hold", "1".to_string())]
        } else {
            Vec::new()
        }
    }
}

impl Job {
    pub fn fetch<'s>(session: &'s Session, job_id: u64, array_index: u32) -> Result<Bound<'s, Job>> {
        let data = session.get(ApiPath::new("/job").join(job_id).join(array_index))?;
        Bound::hydrate(session, data)
    }

    pub fn list<'s>(session: &'s Session, filter: &JobFilter) -> Result<Vec<Bound<'s, Job>>> {
        match (filter.job_id, filter.array_index) {
            (Some(job_id), Some(array_index)) => Ok(vec![Self::fetch(session, job_id, array_index)?]),
            (Some(job_id), None) => {
                let data = session.get(ApiPath::new("/jobs").join(job_id))?;
                Bound::hydrate_list(session, data)
            }
            (None, _) => {
                let data = session.get_with_query("/jobs/", &filter.query())?;
                Bound::hydrate_list(session, data)
            }
        }
    }

    /// Submit a job. Array submissions return one job per task.
    pub fn submit<'s>(session: &'s Session, submission: &JobSubmission) -> Result<Vec<Bound<'s, Job>>> {
        let body = serde_json::to_value(submission).map_err(Error::Encode)?;
        let data = session.post("/job/submit", Some(&body))?;
        let jobs = match data {
            Value::Array(_) => Bound::hydrate_list(session, data)?,
            other => vec![Bound::hydrate(session, other)?],
        };
        tracing::debug!(count = jobs.len(), "submitted");
        Ok(jobs)
    }

    /// `123` for plain jobs, `123[4]` for array tasks.
    pub fn display_id(&self) -> String {
        if self.array_index == 0 {
            self.job_id.to_string()
        } else {
            format!("{}[{}]", self.job_id, self.array_index)
        }
    }

    pub fn state(&self) -> JobState {
        JobState::from_status_name(&self.status.name)
    }

    pub fn queue_name(&self) -> Option<&str> {
        self.queue.as_ref().map(NameRef::name)
    }

    pub fn submission_host_name(&self) -> Option<&str> {
        self.submission_host.as_ref().map(NameRef::name)
    }

    pub fn execution_host_names(&self) -> Vec<&str> {
        self.execution_hosts.iter().map(|h| h.name.as_str()).collect()
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submit_time
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

impl<'s> Bound<'s, Job> {
    /// Fetch the queue the job is in.
    pub fn fetch_queue(&self) -> Result<Bound<'s, Queue>> {
        let name = self
            .queue_name()
            .ok_or_else(|| Error::Shape(format!("job {} has no queue", self.display_id())))?;
        Queue::fetch(self.session(), name)
    }

    /// Fetch the host the job was submitted from.
    pub fn fetch_submission_host(&self) -> Result<Bound<'s, Host>> {
        let name = self.submission_host_name().ok_or_else(|| {
            Error::Shape(format!("job {} has no submission host", self.display_id()))
        })?;
        Host::fetch(self.session(), name)
    }

    /// Fetch every host the job runs on.
    pub fn fetch_execution_hosts(&self) -> Result<Vec<Bound<'s, Host>>> {
        self.execution_hosts
            .iter()
            .map(|h| Host::fetch(self.session(), &h.name))
            .collect()
    }

    pub fn kill(&self) -> Result<()> {
        self.action("kill", &[])
    }

    pub fn suspend(&self) -> Result<()> {
        self.action("suspend", &[])
    }

    pub fn resume(&self) -> Result<()> {
        self.action("resume", &[])
    }

    pub fn requeue(&self, options: RequeueOptions) -> Result<()> {
        self.action("requeue", &options.query())
    }

    fn action(&self, action: &str, query: &[(&str, String)]) -> Result<()> {
        tracing::debug!(job = %self.display_id(), action, "job action");
        let path = ApiPath::new("/job")
            .join(self.job_id)
            .join(self.array_index)
            .join(action);
        self.session().call(Method::POST, path, query, None)?;
        Ok(())
    }
}
