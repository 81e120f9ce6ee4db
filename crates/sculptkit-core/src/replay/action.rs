//! Replay actions and the ordered log that holds them.

use super::{ReplayError, ReplayResult};
use crate::input::{DeviceEvent, EventKind, Modifiers, MouseButton};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Kind of a recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Args: button id, x, y, modifier bits.
    DeviceDown,
    /// Args: x, y, modifier bits.
    DeviceMove,
    /// Args: x, y.
    DeviceUp,
    /// Args: wheel delta.
    DeviceWheel,
    /// Args: x, y.
    DoubleTap,
    /// Any kind this build does not know; skipped on playback.
    #[serde(other)]
    Unknown,
}

/// One argument of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayValue {
    Number(f64),
    Text(String),
}

/// One persisted step of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayAction {
    pub kind: ActionKind,
    #[serde(default)]
    pub args: Vec<ReplayValue>,
}

impl ReplayAction {
    pub fn new(kind: ActionKind, args: Vec<ReplayValue>) -> Self {
        Self { kind, args }
    }

    fn numbers(kind: ActionKind, values: &[f64]) -> Self {
        Self::new(kind, values.iter().copied().map(ReplayValue::Number).collect())
    }

    pub fn device_down(button: MouseButton, position: Point, modifiers: Modifiers) -> Self {
        Self::numbers(
            ActionKind::DeviceDown,
            &[button.id() as f64, position.x, position.y, modifiers.bits() as f64],
        )
    }

    pub fn device_move(position: Point, modifiers: Modifiers) -> Self {
        Self::numbers(
            ActionKind::DeviceMove,
            &[position.x, position.y, modifiers.bits() as f64],
        )
    }

    pub fn device_up(position: Point) -> Self {
        Self::numbers(ActionKind::DeviceUp, &[position.x, position.y])
    }

    pub fn device_wheel(delta: f32) -> Self {
        Self::numbers(ActionKind::DeviceWheel, &[delta as f64])
    }

    pub fn double_tap(position: Point) -> Self {
        Self::numbers(ActionKind::DoubleTap, &[position.x, position.y])
    }

    fn number(&self, arg: usize, index: usize) -> ReplayResult<f64> {
        match self.args.get(arg) {
            Some(ReplayValue::Number(n)) => Ok(*n),
            Some(ReplayValue::Text(text)) => Err(self.malformed(index, format!("argument {arg} is text '{text}'"))),
            None => Err(self.malformed(index, format!("missing argument {arg}"))),
        }
    }

    fn malformed(&self, index: usize, reason: String) -> ReplayError {
        ReplayError::MalformedAction {
            index,
            kind: self.kind,
            reason,
        }
    }

    /// Decode into the event to dispatch. `index` is the action's position in
    /// its log, used for error reporting. Unknown kinds decode to `None`.
    pub fn to_event(&self, index: usize) -> ReplayResult<Option<DeviceEvent>> {
        let event = match self.kind {
            ActionKind::DeviceDown => {
                let id = self.number(0, index)?;
                let button = MouseButton::from_id(id as u8)
                    .ok_or_else(|| self.malformed(index, format!("unknown button {id}")))?;
                let position = Point::new(self.number(1, index)?, self.number(2, index)?);
                let modifiers = Modifiers::from_bits(self.number(3, index)? as u8);
                DeviceEvent::down(position, button, modifiers)
            }
            ActionKind::DeviceMove => {
                let position = Point::new(self.number(0, index)?, self.number(1, index)?);
                DeviceEvent::moved(position, Modifiers::from_bits(self.number(2, index)? as u8))
            }
            ActionKind::DeviceUp => {
                DeviceEvent::up(Point::new(self.number(0, index)?, self.number(1, index)?))
            }
            ActionKind::DeviceWheel => DeviceEvent::wheel(self.number(0, index)? as f32),
            ActionKind::DoubleTap => {
                DeviceEvent::double_activate(Point::new(self.number(0, index)?, self.number(1, index)?))
            }
            ActionKind::Unknown => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Whether this action replays the given event kind.
    pub fn matches(&self, kind: EventKind) -> bool {
        matches!(
            (self.kind, kind),
            (ActionKind::DeviceDown, EventKind::Down)
                | (ActionKind::DeviceMove, EventKind::Move)
                | (ActionKind::DeviceUp, EventKind::Up)
                | (ActionKind::DeviceWheel, EventKind::Wheel(_))
                | (ActionKind::DoubleTap, EventKind::DoubleActivate)
        )
    }
}

/// Ordered sequence of actions with a source name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub name: String,
    pub actions: Vec<ReplayAction>,
}

impl ReplayLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, action: ReplayAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a log. The name stored in the file is replaced by `name`.
    pub fn from_json(json: &str, name: &str) -> ReplayResult<Self> {
        let mut log: ReplayLog =
            serde_json::from_str(json).map_err(|e| ReplayError::Parse(e.to_string()))?;
        log.name = name.to_string();
        Ok(log)
    }

    pub fn from_bytes(data: &[u8], name: &str) -> ReplayResult<Self> {
        let json = std::str::from_utf8(data).map_err(|e| ReplayError::Parse(e.to_string()))?;
        Self::from_json(json, name)
    }
}
