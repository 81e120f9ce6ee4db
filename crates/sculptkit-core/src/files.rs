//! Routing of opened or dropped files by extension.

use serde::{Deserialize, Serialize};

/// Reserved extension of replay logs.
pub const REPLAY_EXTENSION: &str = ".rep";

/// Supported file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Obj,
    Sgl,
    Stl,
    Ply,
    /// Replay log, routed to the replay player instead of the scene.
    Rep,
}

impl FileType {
    /// Detect the type from a file name (case-insensitive suffix).
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        [
            (".obj", FileType::Obj),
            (".sgl", FileType::Sgl),
            (".stl", FileType::Stl),
            (".ply", FileType::Ply),
            (REPLAY_EXTENSION, FileType::Rep),
        ]
        .into_iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, kind)| kind)
    }

    pub fn is_replay(self) -> bool {
        self == FileType::Rep
    }
}

/// A file selected for loading, by its index in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutedFile {
    pub index: usize,
    pub file_type: FileType,
}

/// Pick the files of a batch to load, in order.
///
/// Unknown extensions are skipped. A replay log ends the batch: nothing after
/// it is loaded.
pub fn route_batch<S: AsRef<str>>(names: &[S]) -> Vec<RoutedFile> {
    let mut routed = Vec::new();
    for (index, name) in names.iter().enumerate() {
        let Some(file_type) = FileType::from_name(name.as_ref()) else {
            log::warn!("Ignoring file with unknown extension: {}", name.as_ref());
            continue;
        };
        routed.push(RoutedFile { index, file_type });
        if file_type.is_replay() {
            break;
        }
    }
    routed
}

/// Name of a replay log derived from its file name.
pub fn replay_name(file_name: &str) -> &str {
    let cut = file_name.len().saturating_sub(REPLAY_EXTENSION.len());
    if file_name.is_char_boundary(cut) && file_name[cut..].eq_ignore_ascii_case(REPLAY_EXTENSION) {
        &file_name[..cut]
    } else {
        file_name
    }
}
