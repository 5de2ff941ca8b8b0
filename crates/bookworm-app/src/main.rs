#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that loads configuration and runs the requested post-processing command.

use std::process::ExitCode;

use bookworm_app::{Cli, run_app};
use clap::Parser;

/// Parses arguments, runs the command, and maps the outcome onto an exit code.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_app(cli).await {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            eprintln!("error: {}", err.detail());
            ExitCode::FAILURE
        }
    }
}
