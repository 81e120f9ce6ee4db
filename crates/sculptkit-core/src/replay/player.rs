//! Feeds a replay log back through the dispatcher.

use super::{ReplayLog, ReplayResult};
use crate::dispatch::Dispatcher;
use crate::input::DeviceEvent;

/// An in-progress playback.
///
/// The dispatcher is in replay mode for as long as the player lives: live
/// position mapping and overlay focus are bypassed and nothing is recorded.
/// Dropping the player, including on an early error return, ends replay mode
/// and closes any gesture the log left open.
pub struct Player<'a> {
    dispatcher: &'a mut Dispatcher,
    log: &'a ReplayLog,
    cursor: usize,
}

impl<'a> Player<'a> {
    pub fn new(dispatcher: &'a mut Dispatcher, log: &'a ReplayLog) -> Self {
        log::info!("Replaying '{}' ({} actions)", log.name, log.len());
        dispatcher.begin_replay();
        Self {
            dispatcher,
            log,
            cursor: 0,
        }
    }

    /// Play a whole log. Returns the number of actions processed.
    pub fn play(dispatcher: &mut Dispatcher, log: &ReplayLog) -> ReplayResult<usize> {
        Player::new(dispatcher, log).finish()
    }

    /// Index of the next action to execute.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.log.len()
    }

    /// Execute the next action. Returns `Ok(false)` once the log is exhausted.
    pub fn step(&mut self) -> ReplayResult<bool> {
        let index = self.cursor;
        let Some(action) = self.log.actions.get(index) else {
            return Ok(false);
        };
        self.cursor += 1;

        match action.to_event(index)? {
            Some(event) => self.dispatcher.dispatch(event),
            None => log::warn!("Skipping unknown replay action #{}", index),
        }
        Ok(true)
    }

    /// Execute every remaining action.
    pub fn finish(mut self) -> ReplayResult<usize> {
        while self.step()? {}
        log::info!("Replay '{}' finished", self.log.name);
        Ok(self.cursor)
    }
}

impl Drop for Player<'_> {
    fn drop(&mut self) {
        if !self.dispatcher.mode().is_idle() {
            log::debug!("Closing gesture left open by '{}'", self.log.name);
            let position = self.dispatcher.position();
            self.dispatcher.dispatch(DeviceEvent::up(position));
        }
        self.dispatcher.end_replay();
    }
}
