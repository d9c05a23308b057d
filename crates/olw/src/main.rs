//! olw - command line client for the OpenLava web API.

mod admin;
mod jobs;
mod listing;
mod report;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use olw_cli::{Args, Command};
use olw_objects::Bound;
use olw_session::Session;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.connection.session_config().into_diagnostic()?;
    let session = Session::configure(config).into_diagnostic()?;

    let output = match &args.command {
        Command::Bhosts(a) => listing::bhosts(&session, a),
        Command::Bqueues(a) => listing::bqueues(&session, a),
        Command::Busers(a) => listing::busers(&session, a),
        Command::Bjobs(a) => jobs::bjobs(&session, a),
        Command::Bkill(a) => jobs::bkill(&session, a),
        Command::Bsub(a) => jobs::bsub(&session, a),
        Command::Badmin(c) => admin::badmin(&session, c),
    }?;
    print!("{output}");
    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn records<T>(bound: Vec<Bound<'_, T>>) -> Vec<T> {
    bound.into_iter().map(Bound::into_record).collect()
}

/// Fetch each named entity. Failed lookups are reported and skipped; local
/// errors stop the listing.
fn fetch_each<'s, T>(
    names: &[String],
    fetch: impl Fn(&str) -> olw_session::Result<Bound<'s, T>>,
) -> Result<Vec<T>> {
    let mut found = Vec::new();
    for name in names {
        match fetch(name) {
            Ok(entity) => found.push(entity.into_record()),
            Err(e) if !e.is_local() => eprintln!("{name}: {e}"),
            Err(e) => return Err(e).into_diagnostic(),
        }
    }
    Ok(found)
}

#[cfg(test)]
mod testing {
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
