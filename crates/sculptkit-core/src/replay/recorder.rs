//! Appends canonical events to the session's replay log.

use super::{ReplayAction, ReplayLog};

/// Records actions in arrival order.
///
/// While a log is being played back the recorder is suspended, so replayed
/// events never feed back into the log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: ReplayLog,
    playing: bool,
}

impl Recorder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            log: ReplayLog::new(name),
            playing: false,
        }
    }

    /// Append an action; a no-op during playback.
    pub fn record(&mut self, action: ReplayAction) {
        if self.playing {
            return;
        }
        self.log.push(action);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub(crate) fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn log(&self) -> &ReplayLog {
        &self.log
    }

    /// Take the recorded log, leaving an empty one with the same name.
    pub fn take_log(&mut self) -> ReplayLog {
        let name = self.log.name.clone();
        std::mem::replace(&mut self.log, ReplayLog::new(name))
    }

    pub fn clear(&mut self) {
        self.log.actions.clear();
    }
}
