//! Helper executable that replays a recorded snapshot over stdio.
//!
//! The daemon can be pointed at this binary through
//! `APP_AUTOMATION_SAFARI_HELPER` or `APP_AUTOMATION_MESSAGES_HELPER` to
//! exercise helper-delegated methods without accessibility access.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

use automation_helper::{HelperService, ReplayProvider};
use camino::Utf8PathBuf;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const REPLAY_TARGET: &str = "automation_helper::replay";

/// Serves helper requests from a recorded snapshot.
#[derive(Debug, Parser)]
#[command(name = "automation-helper-replay", version)]
struct Args {
    /// Application name reported by the helper.
    #[arg(long, default_value = "Safari")]
    app: String,
    /// JSON snapshot to replay; an empty tree when omitted.
    #[arg(long)]
    snapshot: Option<Utf8PathBuf>,
    /// Milliseconds to wait before answering each `perform` request.
    #[arg(long, default_value_t = 0)]
    perform_delay_ms: u64,
    /// Exit after answering this many requests.
    #[arg(long)]
    max_requests: Option<usize>,
    /// `tracing` filter for diagnostics written to stderr.
    #[arg(long, default_value = "warn")]
    log_filter: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_filter))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let provider = match &args.snapshot {
        Some(path) => match ReplayProvider::from_file(args.app.clone(), path) {
            Ok(provider) => provider,
            Err(err) => {
                error!(target: REPLAY_TARGET, error = %err, "failed to load snapshot");
                return ExitCode::FAILURE;
            }
        },
        None => ReplayProvider::empty(args.app.clone()),
    }
    .with_perform_delay(Duration::from_millis(args.perform_delay_ms));

    let mut service = HelperService::new(provider);
    if let Some(limit) = args.max_requests {
        service = service.with_request_limit(limit);
    }

    match service.serve(io::stdin().lock(), io::stdout().lock()) {
        Ok(served) => {
            info!(target: REPLAY_TARGET, app = %args.app, served, "replay helper finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(target: REPLAY_TARGET, error = %err, "replay helper failed");
            ExitCode::FAILURE
        }
    }
}
