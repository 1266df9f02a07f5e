//! Entry point for the automation daemon.
//!
//! Configuration failures happen before telemetry exists, so the final error
//! is always written to stderr as well.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match automationd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "automationd::process", %error, "daemon exited with an error");
            writeln!(io::stderr().lock(), "automationd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
