//! Table and record printers for the listing commands.

use olw_cli::Format;
use olw_objects::{Host, Job, JobState, Queue, User};
use std::fmt::Write;

/// Integer limit the scheduler uses for "no limit".
const INT_UNLIMITED: i64 = 2147483647;
/// Float limit the scheduler uses for "no limit".
const FLOAT_UNLIMITED: f64 = 2147483648.0;

const HOST_COLUMNS: [(&str, usize); 9] = [
    ("HOST_NAME", 18),
    ("STATUS", 12),
    ("JL/U", 7),
    ("MAX", 4),
    ("NJOBS", 8),
    ("RUN", 4),
    ("SSUSP", 6),
    ("USUSP", 8),
    ("RSV", 4),
];

const QUEUE_COLUMNS: [(&str, usize); 11] = [
    ("QUEUE_NAME", 15),
    ("PRIO", 4),
    ("STATUS", 15),
    ("MAX", 3),
    ("JL/U", 4),
    ("JL/P", 4),
    ("JL/H", 4),
    ("NJOBS", 7),
    ("PEND", 6),
    ("RUN", 4),
    ("SUSP", 4),
];

const JOB_COLUMNS: [(&str, usize); 8] = [
    ("JOBID", 7),
    ("USER", 7),
    ("STAT", 5),
    ("QUEUE", 10),
    ("FROM_HOST", 11),
    ("EXEC_HOST", 11),
    ("JOB_NAME", 11),
    ("SUBMIT_TIME", 12),
];

const USER_COLUMNS: [(&str, usize); 9] = [
    ("USER/GROUP", 15),
    ("JL/P", 5),
    ("MAX", 5),
    ("NJOBS", 6),
    ("PEND", 6),
    ("RUN", 6),
    ("SSUSP", 6),
    ("USUSP", 6),
    ("RSV", 6),
];

/// Left-align `text` in `width`, cutting it when `truncate` is set.
fn cell(text: &str, width: usize, truncate: bool) -> String {
    let text: String = if truncate {
        text.chars().take(width).collect()
    } else {
        text.to_string()
    };
    format!("{text:<width$}")
}

fn row<const N: usize>(columns: &[(&str, usize); N], values: [String; N], truncate: bool) -> String {
    let cells: Vec<String> = columns
        .iter()
        .zip(values.iter())
        .map(|((_, width), value)| cell(value, *width, truncate))
        .collect();
    cells.join(" ").trim_end().to_string()
}

fn header<const N: usize>(columns: &[(&str, usize); N]) -> String {
    row(columns, columns.map(|(name, _)| name.to_string()), true)
}

fn num(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Integer limit, `-` when unlimited or unknown.
fn limit(value: Option<i64>) -> String {
    match value {
        Some(v) if v != INT_UNLIMITED => v.to_string(),
        _ => "-".to_string(),
    }
}

/// Float limit, `-` when unlimited or unknown.
fn limit_f(value: Option<f64>) -> String {
    match value {
        Some(v) if v < FLOAT_UNLIMITED && v >= 0.0 => v.to_string(),
        _ => "-".to_string(),
    }
}

/// Format seconds as a duration (e.g. "1d 02:30:00", "01:30:00", "05:30").
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours >= 24 {
        format!("{}d {:02}:{:02}:{:02}", hours / 24, hours % 24, mins, secs)
    } else if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

fn host_values(host: &Host) -> [String; 9] {
    [
        host.hostname().to_string(),
        host.status_summary(),
        limit(host.max_slots_per_user),
        num(host.max_slots),
        num(host.total_slots),
        num(host.num_running_slots),
        num(host.num_system_suspended_slots),
        num(host.num_user_suspended_slots),
        num(host.num_reserved_slots),
    ]
}

pub fn hosts(hosts: &[Host], format: Format) -> String {
    match format {
        Format::Long => hosts.iter().map(host_long).collect(),
        Format::Short | Format::Wide => {
            let truncate = format == Format::Short;
            let mut out = header(&HOST_COLUMNS) + "\n";
            for host in hosts {
                out += &row(&HOST_COLUMNS, host_values(host), truncate);
                out.push('\n');
            }
            out
        }
    }
}

fn host_long(host: &Host) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "HOST  {}\n", host.hostname());
    let _ = writeln!(
        out,
        "STATUS           CPUF  JL/U    MAX  NJOBS    RUN  SSUSP  USUSP    RSV DISPATCH_WINDOW"
    );
    let _ = writeln!(
        out,
        "{:<16} {:<5} {:<7} {:<4} {:<8} {:<4} {:<6} {:<8} {:<3} {}",
        host.status_summary(),
        host.cpu_factor.map_or_else(|| "-".to_string(), |c| c.to_string()),
        limit(host.max_slots_per_user),
        num(host.max_slots),
        num(host.total_slots),
        num(host.num_running_slots),
        num(host.num_system_suspended_slots),
        num(host.num_user_suspended_slots),
        num(host.num_reserved_slots),
        host.run_windows.as_deref().filter(|w| !w.is_empty()).unwrap_or("-"),
    );

    if let Some(load) = &host.load_information {
        let _ = writeln!(out, "\nLOAD THRESHOLD USED FOR SCHEDULING:");
        let widths: Vec<usize> = load.short_names.iter().map(|n| n.len().max(5)).collect();
        let mut names = format!("{:<20} ", "");
        for (name, width) in load.short_names.iter().zip(widths.iter().copied()) {
            let _ = write!(names, "{name:>width$} ");
        }
        let _ = writeln!(out, "{}", names.trim_end());
        for values in &load.values {
            let mut line = format!("{:<20} ", cell(&values.name, 20, true));
            for (value, width) in values.values.iter().zip(widths.iter().copied()) {
                let text = if *value == -1.0 || *value >= FLOAT_UNLIMITED {
                    "-".to_string()
                } else {
                    value.to_string()
                };
                let _ = write!(line, "{:>width$} ", cell(&text, width, true).trim_end());
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }
    out.push('\n');
    out
}

fn queue_values(queue: &Queue) -> [String; 11] {
    [
        queue.name.clone(),
        num(queue.priority),
        queue.status_summary(),
        limit(queue.max_slots),
        limit(queue.max_slots_per_user),
        limit_f(queue.max_slots_per_processor),
        limit(queue.max_slots_per_host),
        num(queue.total_slots),
        num(queue.num_pending_slots),
        num(queue.num_running_slots),
        num(queue.num_suspended_slots),
    ]
}

pub fn queues(queues: &[Queue], format: Format) -> String {
    match format {
        Format::Long => queues.iter().map(queue_long).collect(),
        Format::Short | Format::Wide => {
            let truncate = format == Format::Short;
            let mut out = header(&QUEUE_COLUMNS) + "\n";
            for queue in queues {
                out += &row(&QUEUE_COLUMNS, queue_values(queue), truncate);
                out.push('\n');
            }
            out
        }
    }
}

fn queue_long(queue: &Queue) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "QUEUE: {}", queue.name);
    let _ = writeln!(out, "  -- {}\n", queue.description.as_deref().unwrap_or(""));
    let _ = writeln!(out, "PARAMETERS/STATISTICS");
    let _ = writeln!(
        out,
        "PRIO NICE STATUS          MAX JL/U JL/P JL/H NJOBS  PEND   RUN SSUSP USUSP  RSV"
    );
    let _ = writeln!(
        out,
        "{:<4} {:<4} {:<15} {:<3} {:<4} {:<4} {:<4} {:<6} {:<6} {:<5} {:<5} {:<6} {}",
        num(queue.priority),
        num(queue.nice),
        queue.status_summary(),
        limit(queue.max_slots),
        limit(queue.max_slots_per_user),
        limit_f(queue.max_slots_per_processor),
        limit(queue.max_slots_per_host),
        num(queue.total_slots),
        num(queue.num_pending_slots),
        num(queue.num_running_slots),
        num(queue.num_system_suspended_slots),
        num(queue.num_user_suspended_slots),
        num(queue.num_reserved_slots),
    );
    let _ = writeln!(
        out,
        "Interval for a host to accept two jobs is {} seconds\n",
        num(queue.accept_interval)
    );
    let _ = writeln!(out, "USERS:  {}", names_or(queue.allowed_users.as_deref(), "all users"));
    let _ = writeln!(out, "HOSTS:  {}\n", names_or(queue.allowed_hosts.as_deref(), "all hosts"));
    out
}

fn names_or(names: Option<&[String]>, fallback: &str) -> String {
    match names {
        Some(names) if !names.is_empty() => names.join(", "),
        _ => fallback.to_string(),
    }
}

fn submit_time(job: &Job) -> String {
    job.submitted_at()
        .map_or_else(|| "-".to_string(), |t| t.format("%b %d %H:%M").to_string())
}

fn job_values(job: &Job) -> [String; 8] {
    [
        job.display_id(),
        job.user_name.clone().unwrap_or_default(),
        job.state().code().to_string(),
        job.queue_name().unwrap_or("-").to_string(),
        job.submission_host_name().unwrap_or("-").to_string(),
        job.execution_host_names().join(" "),
        job.name.clone().unwrap_or_default(),
        submit_time(job),
    ]
}

pub fn jobs(jobs: &[Job], format: Format) -> String {
    match format {
        Format::Long => jobs.iter().map(job_long).collect(),
        Format::Short | Format::Wide => {
            let truncate = format == Format::Short;
            let mut out = header(&JOB_COLUMNS) + "\n";
            for job in jobs {
                out += &row(&JOB_COLUMNS, job_values(job), truncate);
                out.push('\n');
            }
            out
        }
    }
}

/// Split `text` into an 80 column first line and indented continuations.
fn wrap_summary(text: &str) -> Vec<String> {
    const WIDTH: usize = 80;
    const INDENT: &str = "            ";
    let chars: Vec<char> = text.chars().collect();
    let (first, mut rest) = chars.split_at(chars.len().min(WIDTH));
    let mut lines = vec![first.iter().collect::<String>()];
    while !rest.is_empty() {
        let (chunk, tail) = rest.split_at(rest.len().min(WIDTH - INDENT.len()));
        lines.push(format!("{INDENT}{}", chunk.iter().collect::<String>()));
        rest = tail;
    }
    lines
}

fn job_long(job: &Job) -> String {
    let mut out = String::from("\n");
    let summary = format!(
        "Job <{}>, User <{}>, Project <{}>, Status <{}>, Queue <{}>, Command <{}>",
        job.display_id(),
        job.user_name.as_deref().unwrap_or(""),
        job.project_names.first().map_or("-", String::as_str),
        job.state(),
        job.queue_name().unwrap_or("-"),
        job.command.as_deref().unwrap_or(""),
    );
    for line in wrap_summary(&summary) {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(
        out,
        "{}: submitted from host: <{}>, CWD <{}>",
        job.submitted_at()
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        job.submission_host_name().unwrap_or("-"),
        job.cwd.as_deref().unwrap_or(""),
    );
    if let Some(cpu) = job.cpu_time.filter(|c| *c > 0.0) {
        let _ = writeln!(out, "CPU time used: {}", format_duration(cpu as u64));
    }
    match job.state() {
        JobState::Pending => {
            let _ = writeln!(out, "PENDING REASONS:\n{}", job.pending_reasons.as_deref().unwrap_or(""));
        }
        JobState::UserSuspended | JobState::SystemSuspended | JobState::PendingSuspended => {
            let _ = writeln!(out, "SUSPENDING REASONS:\n{}", job.suspension_reasons.as_deref().unwrap_or(""));
        }
        _ => {}
    }
    out.push('\n');
    out
}

pub fn users(users: &[User]) -> String {
    let mut out = header(&USER_COLUMNS) + "\n";
    for user in users {
        let values = [
            user.name.clone(),
            limit_f(user.max_slots_per_processor),
            limit(user.max_slots),
            num(user.total_slots),
            num(user.num_pending_slots),
            num(user.num_running_slots),
            num(user.num_system_suspended_slots),
            num(user.num_user_suspended_slots),
            num(user.num_reserved_slots),
        ];
        out += &row(&USER_COLUMNS, values, true);
        out.push('\n');
    }
    out
}
