//! Typed hosts, queues, jobs and users of an OpenLava cluster, hydrated from
//! the web API through an [`olw_session::Session`].

pub mod host;
pub mod hydrate;
pub mod job;
pub mod queue;
pub mod records;
pub mod user;

pub use host::Host;
pub use hydrate::{Bound, Entity, hydrate, hydrate_list};
pub use job::{
    Job, JobFilter, JobState, JobStateFilter, JobSubmission, RequeueOptions, SUBMIT_FIELDS,
};
pub use queue::{Queue, QueueFilter};
pub use records::{
    ConsumedResource, ExecutionHost, JobOption, LoadInformation, LoadValues, NameRef, Process,
    Resource, ResourceLimit, Status,
};
pub use user::User;

#[cfg(test)]
pub(crate) mod testing {
    use olw_session::{MockTransport, Session, SessionConfig};

    pub fn session_with(mock: &MockTransport) -> Session {
        let config = SessionConfig::new(
            "http://olw.test",
            Some("admin".to_string()),
            Some("secret".to_string()),
        )
        .unwrap();
        Session::with_transport(config, Box::new(mock.clone()))
    }
}
