//! # amail
//!
//! Command line for a per-project mailbox shared by coding agents and
//! their human. Every invocation is a short-lived process working on
//! `.amail/mail.db`; `amail watch` is the only long-running one.
//!
//! Logs go to stderr so stdout stays clean for JSON output and for
//! `source <(amail use <role>)`.

mod cli;
mod commands;
mod error;
mod format;
mod output;
mod watch;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::output::{print_error, OutputMode};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mode = OutputMode::detect(cli.json, cli.text);
    tracing::debug!(?mode, command = ?cli.command, "dispatching");

    match commands::run(cli.command, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(mode, &e);
            ExitCode::FAILURE
        }
    }
}
