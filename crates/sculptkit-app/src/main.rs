//! `sculptkit-replay` entry point.

use clap::Parser;
use sculptkit_app::cli::{CliArgs, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting sculptkit-replay");
    run(CliArgs::parse())
}
