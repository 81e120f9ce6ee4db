//! Command-line interface of `sculptkit-replay`.
//!
//! Usage:
//!   sculptkit-replay session.rep
//!   sculptkit-replay --scene head.json --config tuning.json head.obj session.rep
//!   sculptkit-replay --stored demo
//!   sculptkit-replay --list
//!
//! Collaborator calls are printed to stdout, one JSON object per line.

use crate::app::{App, AppConfig, AppError};
use clap::Parser;
use sculptkit_core::replay::ReplayStore;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Replay recorded sculpting sessions headlessly.
#[derive(Parser, Debug)]
#[command(name = "sculptkit-replay", version, about)]
pub struct CliArgs {
    /// Files to open as one batch. Mesh files are loaded into the scene and
    /// the first `.rep` log is replayed; files after it are ignored.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Interaction tuning (JSON). Defaults apply to omitted fields.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Scene description (JSON): meshes with pick regions, placement and bounds.
    #[arg(short, long, value_name = "FILE")]
    pub scene: Option<PathBuf>,

    /// Replay a log from the replay store by name.
    #[arg(long, value_name = "NAME")]
    pub stored: Option<String>,

    /// Replay store directory. Defaults to the platform data directory.
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// List the logs in the replay store and exit.
    #[arg(long)]
    pub list: bool,
}

impl CliArgs {
    fn store(&self) -> Result<ReplayStore, AppError> {
        Ok(match &self.store_dir {
            Some(dir) => ReplayStore::new(dir.clone())?,
            None => ReplayStore::default_location()?,
        })
    }
}

/// Run the CLI and write call lines to `out`.
pub fn execute(args: &CliArgs, out: &mut impl Write) -> Result<(), AppError> {
    if args.list {
        for name in args.store()?.list()? {
            writeln!(out, "{}", name).map_err(|e| AppError::Io(e.to_string()))?;
        }
        return Ok(());
    }

    let config = AppConfig::load(args.config.as_deref(), args.scene.as_deref())?;
    let mut app = App::new(&config);

    if !args.files.is_empty() {
        let routed = app.open_paths(&args.files)?;
        log::info!("Processed {} of {} files", routed.len(), args.files.len());
    }
    if let Some(name) = &args.stored {
        let count = app.play_stored(&args.store()?, name)?;
        log::info!("Replayed {} actions from '{}'", count, name);
    }

    for line in app.call_lines()? {
        writeln!(out, "{}", line).map_err(|e| AppError::Io(e.to_string()))?;
    }
    Ok(())
}

pub fn run(args: CliArgs) -> ExitCode {
    let stdout = std::io::stdout();
    match execute(&args, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("sculptkit-replay: {}", e);
            ExitCode::FAILURE
        }
    }
}
