//! Replay logs persisted as `.rep` files.

use super::{ReplayError, ReplayLog, ReplayResult};
use crate::files::REPLAY_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory of replay logs, one `<name>.rep` JSON file per log.
pub struct ReplayStore {
    base_path: PathBuf,
}

impl ReplayStore {
    /// Open a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> ReplayResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                ReplayError::Io(format!("Failed to create replay directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Store under the platform data directory.
    ///
    /// On Linux: `~/.local/share/sculptkit/replays/`
    /// On Windows: `%LOCALAPPDATA%\sculptkit\replays\`
    pub fn default_location() -> ReplayResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| ReplayError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("sculptkit").join("replays"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn log_path(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}{}", safe, REPLAY_EXTENSION))
    }

    pub fn save(&self, log: &ReplayLog) -> ReplayResult<()> {
        let path = self.log_path(&log.name);
        let json = log.to_json().map_err(|e| ReplayError::Parse(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| ReplayError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::info!("Saved replay '{}' to {}", log.name, path.display());
        Ok(())
    }

    pub fn load(&self, name: &str) -> ReplayResult<ReplayLog> {
        let path = self.log_path(name);
        if !path.exists() {
            return Err(ReplayError::NotFound(name.to_string()));
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| ReplayError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        ReplayLog::from_json(&json, name)
    }

    /// Remove a log. Deleting a missing log is not an error.
    pub fn delete(&self, name: &str) -> ReplayResult<()> {
        let path = self.log_path(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                ReplayError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    /// Names of all stored logs, sorted.
    pub fn list(&self) -> ReplayResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| ReplayError::Io(format!("Failed to read directory: {}", e)))?;

        let extension = REPLAY_EXTENSION.trim_start_matches('.');
        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == extension))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.log_path(name).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, MouseButton};
    use crate::replay::ReplayAction;
    use kurbo::Point;
    use tempfile::tempdir;

    fn sample(name: &str) -> ReplayLog {
        let mut log = ReplayLog::new(name);
        log.push(ReplayAction::device_down(
            MouseButton::Primary,
            Point::new(3.0, 4.0),
            Modifiers::NONE,
        ));
        log.push(ReplayAction::device_up(Point::new(3.0, 4.0)));
        log
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path().to_path_buf()).unwrap();

        store.save(&sample("stroke")).unwrap();
        assert!(store.exists("stroke"));
        assert!(dir.path().join("stroke.rep").exists());

        let loaded = store.load("stroke").unwrap();
        assert_eq!(loaded, sample("stroke"));
    }

    #[test]
    fn test_load_missing() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path().to_path_buf()).unwrap();
        assert!(matches!(store.load("nope"), Err(ReplayError::NotFound(_))));
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path().to_path_buf()).unwrap();
        store.save(&sample("b")).unwrap();
        store.save(&sample("a")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);

        store.delete("a").unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.list().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_names_are_sanitized() {
        let dir = tempdir().unwrap();
        let store = ReplayStore::new(dir.path().to_path_buf()).unwrap();
        store.save(&sample("../escape")).unwrap();

        assert!(dir.path().join("___escape.rep").exists());
        assert!(store.exists("../escape"));
    }

    #[test]
    fn test_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("deep").join("replays");
        let store = ReplayStore::new(nested.clone()).unwrap();
        assert_eq!(store.base_path(), nested.as_path());
        assert!(nested.exists());
    }
}
