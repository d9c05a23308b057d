//! CLI argument parsing for olw.

use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use olw_objects::JobStateFilter;
use olw_session::SessionConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "olw")]
#[command(about = "Command line client for the OpenLava web API")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// How to reach and authenticate with the server.
#[derive(ClapArgs, Debug, Clone)]
pub struct ConnectionArgs {
    /// URL of the server
    #[arg(long, env = "OLW_URL")]
    pub url: String,

    /// Username to use when authenticating
    #[arg(long, env = "OLW_USERNAME")]
    pub username: Option<String>,

    /// Password to use when authenticating
    #[arg(long, env = "OLW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    pub fn session_config(&self) -> olw_session::Result<SessionConfig> {
        let config = SessionConfig::new(&self.url, self.username.clone(), self.password.clone())?;
        Ok(match self.timeout {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display hosts and their resources
    Bhosts(BhostsArgs),
    /// Display queues
    Bqueues(BqueuesArgs),
    /// Display jobs
    Bjobs(BjobsArgs),
    /// Send a signal to jobs
    Bkill(BkillArgs),
    /// Submit a job
    Bsub(BsubArgs),
    /// Display users and their slot usage
    Busers(BusersArgs),
    /// Administer hosts and queues
    #[command(subcommand)]
    Badmin(BadminCommand),
}

/// Table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Fixed width, truncated columns
    Short,
    /// Columns without truncation
    Wide,
    /// Multi-line records
    Long,
}

#[derive(ClapArgs, Debug, Clone, Copy, Default)]
pub struct FormatArgs {
    /// Wide format, fields are not truncated
    #[arg(short = 'w', conflicts_with = "long")]
    pub wide: bool,

    /// Long multi-line format
    #[arg(short = 'l')]
    pub long: bool,
}

impl FormatArgs {
    pub fn format(&self) -> Format {
        if self.long {
            Format::Long
        } else if self.wide {
            Format::Wide
        } else {
            Format::Short
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct BhostsArgs {
    #[command(flatten)]
    pub format: FormatArgs,

    /// Only display these hosts
    pub host_names: Vec<String>,
}

#[derive(ClapArgs, Debug)]
pub struct BqueuesArgs {
    #[command(flatten)]
    pub format: FormatArgs,

    /// Only display queues that accept jobs from this user (`all`: open to everyone)
    #[arg(short = 'u')]
    pub user_name: Option<String>,

    /// Only display queues that can run jobs on this host (`all`: every host)
    #[arg(short = 'm')]
    pub host_name: Option<String>,

    /// Only display these queues
    pub queue_names: Vec<String>,
}

/// Filters shared by commands that select jobs.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct JobSelection {
    /// Only jobs submitted by this user, `all` for every user [default: current user]
    #[arg(short = 'u')]
    pub user_name: Option<String>,

    /// Only jobs dispatched to this host
    #[arg(short = 'm')]
    pub host_name: Option<String>,

    /// Only jobs in this queue
    #[arg(short = 'q')]
    pub queue_name: Option<String>,

    /// Only jobs with this name
    #[arg(short = 'J')]
    pub job_name: Option<String>,
}

impl JobSelection {
    /// The `-u` value, or the invoking user when not given.
    pub fn user_or_current(&self) -> Option<String> {
        self.user_name.clone().or_else(current_user)
    }
}

#[derive(ClapArgs, Debug)]
#[command(group(ArgGroup::new("state").args(["all", "done", "pending", "running", "suspended"])))]
pub struct BjobsArgs {
    /// Jobs in all states, including recently finished ones
    #[arg(short = 'a')]
    pub all: bool,

    /// Recently finished jobs
    #[arg(short = 'd')]
    pub done: bool,

    /// Pending jobs, with their pending reasons
    #[arg(short = 'p')]
    pub pending: bool,

    /// Running jobs
    #[arg(short = 'r')]
    pub running: bool,

    /// Suspended jobs, with their suspending reasons
    #[arg(short = 's')]
    pub suspended: bool,

    #[command(flatten)]
    pub format: FormatArgs,

    #[command(flatten)]
    pub selection: JobSelection,

    /// Only these jobs, as JOB_ID or JOB_ID[INDEX]
    pub job_ids: Vec<String>,
}

impl BjobsArgs {
    pub fn state_filter(&self) -> JobStateFilter {
        if self.all {
            JobStateFilter::All
        } else if self.done {
            JobStateFilter::Exit
        } else if self.pending {
            JobStateFilter::Pending
        } else if self.running {
            JobStateFilter::Running
        } else if self.suspended {
            JobStateFilter::Suspended
        } else {
            JobStateFilter::Active
        }
    }
}

/// Signals `bkill` can send.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Signal {
    #[default]
    Kill,
    Suspend,
    Resume,
    Requeue,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Kill => "kill",
            Signal::Suspend => "suspend",
            Signal::Resume => "resume",
            Signal::Requeue => "requeue",
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct BkillArgs {
    /// Signal to send
    #[arg(short = 's', value_enum, default_value_t = Signal::Kill)]
    pub signal: Signal,

    /// Hold requeued jobs
    #[arg(long)]
    pub hold: bool,

    #[command(flatten)]
    pub selection: JobSelection,

    /// Jobs to signal, as JOB_ID or JOB_ID[INDEX]; 0 selects every job matching the filters
    #[arg(required = true)]
    pub job_ids: Vec<String>,
}

/// `options` bit: mail when the job is dispatched.
pub const SUB_NOTIFY_BEGIN: u64 = 0x100;
/// `options` bit: mail the job report when the job finishes.
pub const SUB_NOTIFY_END: u64 = 0x80;
/// `options` bit: rerun on another host if the execution host fails.
pub const SUB_RERUNNABLE: u64 = 0x4000;
/// `options` bit: exclusive execution.
pub const SUB_EXCLUSIVE: u64 = 0x40;
/// `options2` bit: hold the job when submitted.
pub const SUB2_HOLD: u64 = 0x01;

#[derive(ClapArgs, Debug)]
pub struct BsubArgs {
    /// Send mail when the job is dispatched
    #[arg(short = 'B')]
    pub notify_begin: bool,

    /// Hold the job in PSUSP when submitted
    #[arg(short = 'H')]
    pub hold: bool,

    /// Send the job report by mail when the job finishes
    #[arg(short = 'N')]
    pub notify_end: bool,

    /// Rerun on another host if the execution host becomes unavailable
    #[arg(short = 'r')]
    pub rerunnable: bool,

    /// Exclusive execution on the host
    #[arg(short = 'x')]
    pub exclusive: bool,

    /// Minimum and optional maximum number of slots, MIN[,MAX]
    #[arg(short = 'n', value_parser = parse_slots)]
    pub slots: Option<SlotRange>,

    /// Job name
    #[arg(short = 'J')]
    pub job_name: Option<String>,

    /// Queue to submit into
    #[arg(short = 'q')]
    pub queue_name: Option<String>,

    /// Project to charge the job to
    #[arg(short = 'P')]
    pub project_name: Option<String>,

    /// Command to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl BsubArgs {
    pub fn options(&self) -> u64 {
        [
            (self.notify_begin, SUB_NOTIFY_BEGIN),
            (self.notify_end, SUB_NOTIFY_END),
            (self.rerunnable, SUB_RERUNNABLE),
            (self.exclusive, SUB_EXCLUSIVE),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(0, |acc, (_, bit)| acc | bit)
    }

    pub fn options2(&self) -> u64 {
        if self.hold { SUB2_HOLD } else { 0 }
    }
}

/// Requested slot range of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub min: u32,
    pub max: u32,
}

fn parse_slots(s: &str) -> Result<SlotRange, String> {
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid slot count: {v}"))
    };
    let (min, max) = match s.split_once(',') {
        Some((min, max)) => (parse(min)?, parse(max)?),
        None => {
            let n = parse(s)?;
            (n, n)
        }
    };
    if max < min {
        return Err(format!("maximum {max} is less than minimum {min}"));
    }
    Ok(SlotRange { min, max })
}

#[derive(ClapArgs, Debug)]
pub struct BusersArgs {
    /// Only display these users
    pub user_names: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum BadminCommand {
    /// Close hosts; `all` closes every host, none closes the local host
    Hclose(HostTargets),
    /// Open hosts; `all` opens every host, none opens the local host
    Hopen(HostTargets),
    /// Open queues to new jobs
    Qopen(QueueTargets),
    /// Close queues to new jobs
    Qclose(QueueTargets),
    /// Activate queues so their jobs are dispatched
    Qact(QueueTargets),
    /// Inactivate queues so their jobs are not dispatched
    Qinact(QueueTargets),
}

#[derive(ClapArgs, Debug)]
pub struct HostTargets {
    pub host_names: Vec<String>,
}

#[derive(ClapArgs, Debug)]
pub struct QueueTargets {
    #[arg(required = true)]
    pub queue_names: Vec<String>,
}

/// A job, or one task of a job array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSpec {
    pub job_id: u64,
    /// `None` selects every task.
    pub array_index: Option<u32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid job id: {0}")]
pub struct InvalidJobId(pub String);

static ARRAY_JOB_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\[(\d+)\]$").expect("valid regex"));

/// Parse `123` or `123[4]`.
pub fn parse_job_id(s: &str) -> Result<JobSpec, InvalidJobId> {
    let s = s.trim();
    if let Ok(job_id) = s.parse::<u64>() {
        return Ok(JobSpec {
            job_id,
            array_index: None,
        });
    }
    let invalid = || InvalidJobId(s.to_string());
    let caps = ARRAY_JOB_ID.captures(s).ok_or_else(invalid)?;
    let job_id = caps[1].parse().map_err(|_| invalid())?;
    let array_index = caps[2].parse().map_err(|_| invalid())?;
    Ok(JobSpec {
        job_id,
        array_index: Some(array_index),
    })
}

/// Name of the invoking user, from `$USER` or `$LOGNAME`.
pub fn current_user() -> Option<String> {
    ["USER", "LOGNAME"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok())
        .filter(|user| !user.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["olw", "--url", "http://olw.test"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(
            parse_job_id("123"),
            Ok(JobSpec {
                job_id: 123,
                array_index: None
            })
        );
        assert_eq!(
            parse_job_id("123[4]"),
            Ok(JobSpec {
                job_id: 123,
                array_index: Some(4)
            })
        );
        assert_eq!(parse_job_id("abc"), Err(InvalidJobId("abc".to_string())));
        assert!(parse_job_id("12[x]").is_err());
        assert!(parse_job_id("-1").is_err());
        assert_eq!(
            parse_job_id("1[2").unwrap_err().to_string(),
            "Invalid job id: 1[2"
        );
    }

    #[test]
    fn test_parse_slots() {
        assert_eq!(parse_slots("4"), Ok(SlotRange { min: 4, max: 4 }));
        assert_eq!(parse_slots("2,8"), Ok(SlotRange { min: 2, max: 8 }));
        assert!(parse_slots("8,2").is_err());
        assert!(parse_slots("x").is_err());
    }

    #[test]
    fn test_bsub_option_bits() {
        let args = parse(&["bsub", "-B", "-N", "-x", "-H", "-n", "2,4", "sleep", "100"]);
        let Command::Bsub(bsub) = args.command else {
            panic!("expected bsub");
        };
        assert_eq!(bsub.options(), 0x100 | 0x80 | 0x40);
        assert_eq!(bsub.options2(), 0x01);
        assert_eq!(bsub.slots, Some(SlotRange { min: 2, max: 4 }));
        assert_eq!(bsub.command, vec!["sleep", "100"]);
    }

    #[test]
    fn test_bsub_command_keeps_its_flags() {
        let args = parse(&["bsub", "-q", "normal", "ls", "-la"]);
        let Command::Bsub(bsub) = args.command else {
            panic!("expected bsub");
        };
        assert_eq!(bsub.queue_name.as_deref(), Some("normal"));
        assert_eq!(bsub.command, vec!["ls", "-la"]);
        assert_eq!(bsub.options(), 0);
    }

    #[test]
    fn test_bjobs_state_flags() {
        let args = parse(&["bjobs", "-p", "-u", "all", "7[2]"]);
        let Command::Bjobs(bjobs) = args.command else {
            panic!("expected bjobs");
        };
        assert_eq!(bjobs.state_filter(), JobStateFilter::Pending);
        assert_eq!(bjobs.selection.user_name.as_deref(), Some("all"));
        assert_eq!(bjobs.job_ids, vec!["7[2]"]);

        let args = parse(&["bjobs"]);
        let Command::Bjobs(bjobs) = args.command else {
            panic!("expected bjobs");
        };
        assert_eq!(bjobs.state_filter(), JobStateFilter::Active);
    }

    #[test]
    fn test_bjobs_state_flags_conflict() {
        let argv = ["olw", "--url", "http://olw.test", "bjobs", "-p", "-r"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_wide_and_long_conflict() {
        let argv = ["olw", "--url", "http://olw.test", "bhosts", "-w", "-l"];
        assert!(Args::try_parse_from(argv).is_err());

        let args = parse(&["bhosts", "-l", "node1"]);
        let Command::Bhosts(bhosts) = args.command else {
            panic!("expected bhosts");
        };
        assert_eq!(bhosts.format.format(), Format::Long);
    }

    #[test]
    fn test_bkill_signal() {
        let args = parse(&["bkill", "-s", "requeue", "--hold", "5"]);
        let Command::Bkill(bkill) = args.command else {
            panic!("expected bkill");
        };
        assert_eq!(bkill.signal, Signal::Requeue);
        assert!(bkill.hold);

        let argv = ["olw", "--url", "http://olw.test", "bkill"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_badmin_subcommands() {
        let args = parse(&["badmin", "hclose"]);
        let Command::Badmin(BadminCommand::Hclose(targets)) = args.command else {
            panic!("expected hclose");
        };
        assert!(targets.host_names.is_empty());

        let args = parse(&["badmin", "qinact", "normal", "long"]);
        let Command::Badmin(BadminCommand::Qinact(targets)) = args.command else {
            panic!("expected qinact");
        };
        assert_eq!(targets.queue_names, vec!["normal", "long"]);
    }

    #[test]
    fn test_connection_config() {
        let args = Args::try_parse_from([
            "olw",
            "--url",
            "http://olw.test/",
            "--username",
            "admin",
            "--timeout",
            "30",
            "-vv",
            "busers",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        let config = args.connection.session_config().unwrap();
        assert_eq!(config.base_url, "http://olw.test");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }
}
