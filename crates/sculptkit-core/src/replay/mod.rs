//! Recording and deterministic playback of interaction sessions.

mod action;
mod player;
mod recorder;

#[cfg(not(target_arch = "wasm32"))]
mod store;

pub use action::{ActionKind, ReplayAction, ReplayLog, ReplayValue};
pub use player::Player;
pub use recorder::Recorder;

#[cfg(not(target_arch = "wasm32"))]
pub use store::ReplayStore;

use thiserror::Error;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Replay not found: {0}")]
    NotFound(String),
    #[error("Malformed replay log: {0}")]
    Parse(String),
    #[error("Malformed action #{index} ({kind:?}): {reason}")]
    MalformedAction {
        index: usize,
        kind: ActionKind,
        reason: String,
    },
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;
