//! badmin: batch host and queue control.
//!
//! Every target is attempted; a failed remote operation on one is reported on
//! its own line and the rest still run.

use miette::{IntoDiagnostic, Result};
use olw_cli::BadminCommand;
use olw_objects::{Bound, Host, Queue};
use olw_session::Session;
use std::fmt::Write;

/// Keyword selecting every host or queue.
const ALL: &str = "all";

#[derive(Debug, Clone, Copy)]
enum Action {
    Open,
    Close,
    Activate,
    Inactivate,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Open => "open",
            Action::Close => "close",
            Action::Activate => "activate",
            Action::Inactivate => "inactivate",
        }
    }

    fn past(self) -> &'static str {
        match self {
            Action::Open => "Opened",
            Action::Close => "Closed",
            Action::Activate => "Activated",
            Action::Inactivate => "Inactivated",
        }
    }
}

pub fn badmin(session: &Session, command: &BadminCommand) -> Result<String> {
    match command {
        BadminCommand::Hclose(targets) => hosts(session, &targets.host_names, Action::Close),
        BadminCommand::Hopen(targets) => hosts(session, &targets.host_names, Action::Open),
        BadminCommand::Qopen(targets) => queues(session, &targets.queue_names, Action::Open),
        BadminCommand::Qclose(targets) => queues(session, &targets.queue_names, Action::Close),
        BadminCommand::Qact(targets) => queues(session, &targets.queue_names, Action::Activate),
        BadminCommand::Qinact(targets) => {
            queues(session, &targets.queue_names, Action::Inactivate)
        }
    }
}

type Target<'s, T> = (String, olw_session::Result<Bound<'s, T>>);

fn host_targets<'s>(session: &'s Session, names: &[String]) -> Result<Vec<Target<'s, Host>>> {
    if names.iter().any(|n| n == ALL) {
        return Ok(Host::list(session)
            .into_diagnostic()?
            .into_iter()
            .map(|h| (h.hostname().to_string(), Ok(h)))
            .collect());
    }
    let names = if names.is_empty() {
        vec![local_hostname()?]
    } else {
        names.to_vec()
    };
    Ok(names
        .into_iter()
        .map(|name| {
            let host = Host::fetch(session, &name);
            (name, host)
        })
        .collect())
}

fn queue_targets<'s>(session: &'s Session, names: &[String]) -> Result<Vec<Target<'s, Queue>>> {
    if names.iter().any(|n| n == ALL) {
        return Ok(Queue::list(session)
            .into_diagnostic()?
            .into_iter()
            .map(|q| (q.name.clone(), Ok(q)))
            .collect());
    }
    Ok(names
        .iter()
        .map(|name| (name.clone(), Queue::fetch(session, name)))
        .collect())
}

fn hosts(session: &Session, names: &[String], action: Action) -> Result<String> {
    let mut out = String::new();
    for (name, host) in host_targets(session, names)? {
        let result = host.and_then(|host| match action {
            Action::Open => host.open(),
            _ => host.close(),
        });
        record(&mut out, "host", &name, action, result)?;
    }
    Ok(out)
}

fn queues(session: &Session, names: &[String], action: Action) -> Result<String> {
    let mut out = String::new();
    for (name, queue) in queue_targets(session, names)? {
        let result = queue.and_then(|queue| match action {
            Action::Open => queue.open(),
            Action::Close => queue.close(),
            Action::Activate => queue.activate(),
            Action::Inactivate => queue.inactivate(),
        });
        record(&mut out, "queue", &name, action, result)?;
    }
    Ok(out)
}

/// Write the outcome of one target. Only local failures stop the batch.
fn record(
    out: &mut String,
    noun: &str,
    name: &str,
    action: Action,
    result: olw_session::Result<()>,
) -> Result<()> {
    match result {
        Ok(()) => {
            let _ = writeln!(out, "{} {noun}: {name}", action.past());
        }
        Err(e) if !e.is_local() => {
            tracing::warn!(%name, error = %e, "{} {noun} failed", action.verb());
            let _ = writeln!(out, "Unable to {} {noun}: {name}: {}", action.verb(), e.reason());
        }
        Err(e) => return Err(e).into_diagnostic(),
    }
    Ok(())
}

fn local_hostname() -> Result<String> {
    Ok(hostname::get().into_diagnostic()?.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_with;
    use olw_cli::{HostTargets, QueueTargets};
    use olw_session::{Method, MockTransport};
    use serde_json::{Value, json};

    fn host(name: &str) -> Value {
        json!({"type": "Host", "name": name, "host_name": name})
    }

    #[test]
    fn test_hclose_continues_after_failure() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts/node1", host("node1"));
        mock.on_ok(Method::GET, "/hosts/node2", host("node2"));
        mock.on(
            Method::POST,
            "/hosts/node1/close",
            403,
            json!({"data": {"exception_class": "PermissionDeniedError", "message": "denied"}}),
        );
        mock.on_ok(Method::POST, "/hosts/node2/close", Value::Null);
        let session = session_with(&mock);

        let command = BadminCommand::Hclose(HostTargets {
            host_names: vec!["node1".to_string(), "node2".to_string()],
        });
        let out = badmin(&session, &command).unwrap();
        assert_eq!(
            out,
            "Unable to close host: node1: denied\nClosed host: node2\n"
        );
    }

    #[test]
    fn test_hclose_continues_after_bad_gateway() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts/node1", host("node1"));
        mock.on_ok(Method::GET, "/hosts/node2", host("node2"));
        mock.on_raw(Method::POST, "/hosts/node1/close", 502, Some("text/html"), b"Bad Gateway");
        mock.on_ok(Method::POST, "/hosts/node2/close", Value::Null);
        let session = session_with(&mock);

        let command = BadminCommand::Hclose(HostTargets {
            host_names: vec!["node1".to_string(), "node2".to_string()],
        });
        let out = badmin(&session, &command).unwrap();
        assert_eq!(
            out,
            "Unable to close host: node1: Unexpected HTTP status 502 from http://olw.test/hosts/node1/close\n\
             Closed host: node2\n"
        );
        assert_eq!(mock.requests_to("/hosts/node2/close").len(), 1);
    }

    #[test]
    fn test_hopen_all_hosts() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/hosts", json!([host("node1"), host("node2")]));
        mock.on_ok(Method::POST, "/hosts/node1/open", Value::Null);
        mock.on_ok(Method::POST, "/hosts/node2/open", Value::Null);
        let session = session_with(&mock);

        let command = BadminCommand::Hopen(HostTargets {
            host_names: vec!["all".to_string()],
        });
        let out = badmin(&session, &command).unwrap();
        assert_eq!(out, "Opened host: node1\nOpened host: node2\n");
    }

    #[test]
    fn test_missing_host_is_reported() {
        let mock = MockTransport::with_login();
        mock.on(
            Method::GET,
            "/hosts/ghost",
            404,
            json!({"message": "No such host: ghost", "data": {"exception_class": "NoSuchHostError"}}),
        );
        let session = session_with(&mock);

        let command = BadminCommand::Hclose(HostTargets {
            host_names: vec!["ghost".to_string()],
        });
        let out = badmin(&session, &command).unwrap();
        assert_eq!(out, "Unable to close host: ghost: No such host: ghost\n");
    }

    #[test]
    fn test_queue_actions() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/queues/normal", json!({"type": "Queue", "name": "normal"}));
        mock.on_ok(Method::POST, "/queues/normal/inactivate", Value::Null);
        mock.on_ok(Method::POST, "/queues/normal/activate", Value::Null);
        let session = session_with(&mock);

        let targets = || QueueTargets {
            queue_names: vec!["normal".to_string()],
        };
        let out = badmin(&session, &BadminCommand::Qinact(targets())).unwrap();
        assert_eq!(out, "Inactivated queue: normal\n");
        let out = badmin(&session, &BadminCommand::Qact(targets())).unwrap();
        assert_eq!(out, "Activated queue: normal\n");
    }

    #[test]
    fn test_local_failure_stops_batch() {
        let mock = MockTransport::with_login();
        mock.on_ok(Method::GET, "/queues/normal", json!({"type": "Host", "name": "normal"}));
        let session = session_with(&mock);

        let command = BadminCommand::Qclose(QueueTargets {
            queue_names: vec!["normal".to_string()],
        });
        assert!(badmin(&session, &command).is_err());
    }
}
