//! Read-only listing commands: bhosts, bqueues, busers.

use crate::{fetch_each, records, report};
use miette::{IntoDiagnostic, Result};
use olw_cli::{BhostsArgs, BqueuesArgs, BusersArgs};
use olw_objects::{Host, Queue, QueueFilter, User};
use olw_session::Session;

pub fn bhosts(session: &Session, args: &BhostsArgs) -> Result<String> {
    let hosts = if args.host_names.is_empty() {
        records(Host::list(session).into_diagnostic()?)
    } else {
        fetch_each(&args.host_names, |name| Host::fetch(session, name))?
    };
    Ok(report::hosts(&hosts, args.format.format()))
}

pub fn bqueues(session: &Session, args: &BqueuesArgs) -> Result<String> {
    let filter = QueueFilter {
        user: args.user_name.clone(),
        host: args.host_name.clone(),
    };
    let queues = if args.queue_names.is_empty() {
        records(Queue::list_matching(session, &filter).into_diagnostic()?)
    } else {
        let mut queues = fetch_each(&args.queue_names, |name| Queue::fetch(session, name))?;
        queues.retain(|q| filter.matches(q));
        queues
    };
    Ok(report::queues(&queues, args.format.format()))
}

pub fn busers(session: &Session, args: &BusersArgs) -> Result<String> {
    let users = if args.user_names.is_empty() {
        records(User::list(session).into_diagnostic()?)
    } else {
        fetch_each(&args.user_names, |name| User::fetch(session, name))?
    };
    Ok(report::users(&users))
}
