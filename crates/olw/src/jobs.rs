//! Job commands: bjobs, bkill, bsub.

use crate::report;
use miette::{IntoDiagnostic, Result};
use olw_cli::{BjobsArgs, BkillArgs, BsubArgs, JobSelection, JobSpec, Signal, parse_job_id};
use olw_objects::{Bound, Job, JobFilter, JobStateFilter, JobSubmission, RequeueOptions};
use olw_session::Session;
use std::fmt::Write;

/// Parse every id up front so a typo aborts before anything is sent.
fn parse_job_ids(ids: &[String]) -> Result<Vec<JobSpec>> {
    ids.iter()
        .map(|id| parse_job_id(id).into_diagnostic())
        .collect()
}

fn selection_filter(selection: &JobSelection) -> JobFilter {
    JobFilter {
        user_name: selection.user_or_current(),
        host_name: selection.host_name.clone(),
        queue_name: selection.queue_name.clone(),
        job_name: selection.job_name.clone(),
        ..JobFilter::default()
    }
}

fn spec_filter(spec: JobSpec) -> JobFilter {
    JobFilter {
        job_id: Some(spec.job_id),
        array_index: spec.array_index,
        ..JobFilter::default()
    }
}

fn spec_label(spec: JobSpec) -> String {
    match spec.array_index {
        Some(index) => format!("{}[{}]", spec.job_id, index),
        None => spec.job_id.to_string(),
    }
}

pub fn bjobs(session: &Session, args: &BjobsArgs) -> Result<String> {
    let specs = parse_job_ids(&args.job_ids)?;
    let mut jobs = Vec::new();
    if specs.is_empty() {
        let filter = JobFilter {
            job_state: Some(args.state_filter()),
            ..selection_filter(&args.selection)
        };
        jobs.extend(Job::list(session, &filter).into_diagnostic()?);
    } else {
        for spec in specs {
            match Job::list(session, &spec_filter(spec)) {
                Ok(found) => jobs.extend(found),
                Err(e) if !e.is_local() => eprintln!("Job <{}>: {e}", spec_label(spec)),
                Err(e) => return Err(e).into_diagnostic(),
            }
        }
    }
    let jobs: Vec<Job> = jobs.into_iter().map(Bound::into_record).collect();
    Ok(report::jobs(&jobs, args.format.format()))
}

pub fn bkill(session: &Session, args: &BkillArgs) -> Result<String> {
    let specs = parse_job_ids(&args.job_ids)?;
    let mut out = String::new();
    let mut jobs = Vec::new();

    if specs.iter().any(|s| s.job_id == 0) {
        let filter = JobFilter {
            job_state: Some(JobStateFilter::Active),
            ..selection_filter(&args.selection)
        };
        jobs = Job::list(session, &filter).into_diagnostic()?;
    } else {
        for spec in specs {
            match Job::list(session, &spec_filter(spec)) {
                Ok(found) => jobs.extend(found),
                Err(e) if !e.is_local() => {
                    let _ = writeln!(out, "Unable to find job: {}: {}", spec_label(spec), e.reason());
                }
                Err(e) => return Err(e).into_diagnostic(),
            }
        }
    }

    for job in &jobs {
        let _ = writeln!(
            out,
            "Sending {} signal to job: {}",
            args.signal.as_str(),
            job.display_id()
        );
        let result = match args.signal {
            Signal::Kill => job.kill(),
            Signal::Suspend => job.suspend(),
            Signal::Resume => job.resume(),
            Signal::Requeue => job.requeue(RequeueOptions { hold: args.hold }),
        };
        match result {
            Ok(()) => {}
            Err(e) if !e.is_local() => {
                let _ = writeln!(
                    out,
                    "Unable to {} job: {}: {}",
                    args.signal.as_str(),
                    job.display_id(),
                    e.reason()
                );
            }
            Err(e) => return Err(e).into_diagnostic(),
        }
    }
    Ok(out)
}

fn submission(args: &BsubArgs) -> JobSubmission {
    let (min, max) = args.slots.map_or((1, 1), |s| (s.min, s.max));
    JobSubmission {
        options: Some(args.options()),
        options2: Some(args.options2()),
        command: Some(args.command.join(" ")),
        requested_slots: Some(min),
        max_requested_slots: Some(max),
        queue_name: args.queue_name.clone(),
        project_name: args.project_name.clone(),
        job_name: args.job_name.clone(),
    }
}

pub fn bsub(session: &Session, args: &BsubArgs) -> Result<String> {
    let jobs = Job::submit(session, &submission(args)).into_diagnostic()?;
    let mut out = String::new();
    for job in &jobs {
        let _ = writeln!(out, "Job: {} was submitted.", job.display_id());
    }
    Ok(out)
}
