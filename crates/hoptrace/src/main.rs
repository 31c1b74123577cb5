#![forbid(unsafe_code)]

use crate::config::{Args, HoptraceConfig};
use crate::error::CliError;
use clap::Parser;
use hoptrace_privilege::Privilege;
use std::process::{self, ExitCode};

mod app;
mod config;
mod error;
mod report;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is::<CliError>() {
                eprintln!("{err}");
            } else {
                eprintln!("error: {err:#}");
            }
            error::exit_code(&err)
        }
    }
}

/// Run the hoptrace application.
///
/// Usage errors detected by the argument parser exit the process directly.
fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let privilege =
        Privilege::acquire_privileges().map_err(|err| CliError::Permission(err.into()))?;
    let pid = u16::try_from(process::id() % u32::from(u16::MAX))?;
    let cfg = HoptraceConfig::from_args(args)?;
    app::run_hoptrace(&cfg, &privilege, pid)
}
