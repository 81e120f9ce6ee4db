//! Headless replay runner.

use sculptkit_core::config::{ConfigError, InteractionConfig};
use sculptkit_core::files::RoutedFile;
use sculptkit_core::replay::{ReplayError, ReplayStore};
use sculptkit_core::session::{Session, SessionError};
use sculptkit_core::trace::{self, Call, CallLog, SceneDescription};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid scene {path}: {reason}")]
    Scene { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("Failed to encode call: {0}")]
    Encode(String),
}

/// Runner configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub interaction: InteractionConfig,
    pub scene: SceneDescription,
}

impl AppConfig {
    /// Build from optional config and scene files; missing files mean defaults.
    pub fn load(config: Option<&Path>, scene: Option<&Path>) -> Result<Self, AppError> {
        let interaction = match config {
            Some(path) => InteractionConfig::load(path)?,
            None => InteractionConfig::default(),
        };
        let scene = match scene {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
                SceneDescription::from_json(&json).map_err(|e| AppError::Scene {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?
            }
            None => SceneDescription::default(),
        };
        Ok(Self { interaction, scene })
    }
}

/// A session over tracing collaborators.
pub struct App {
    session: Session,
    calls: CallLog,
}

impl App {
    pub fn new(config: &AppConfig) -> Self {
        let (collab, calls) = trace::collaborators(&config.scene);
        Self {
            session: Session::new(collab, config.interaction),
            calls,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Collaborator calls made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.calls()
    }

    /// Read files from disk and process them as one batch.
    pub fn open_paths(&mut self, paths: &[PathBuf]) -> Result<Vec<RoutedFile>, AppError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let data = std::fs::read(path)
                .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            files.push((name, data));
        }
        Ok(self.session.open_files(&files)?)
    }

    /// Play a log saved in the replay store.
    pub fn play_stored(&mut self, store: &ReplayStore, name: &str) -> Result<usize, AppError> {
        let log = store.load(name)?;
        Ok(self.session.replay(&log)?)
    }

    /// Calls encoded one JSON object per line.
    pub fn call_lines(&self) -> Result<Vec<String>, AppError> {
        self.calls
            .calls()
            .iter()
            .map(|call| serde_json::to_string(call).map_err(|e| AppError::Encode(e.to_string())))
            .collect()
    }
}
