//! Canonical device events shared by mouse, touch and replayed input.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use winit::event::MouseScrollDelta;
use winit::keyboard::ModifiersState;

/// Mouse button identifiers.
///
/// The numeric ids follow the `which` numbering stored in replay logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
}

impl MouseButton {
    /// Numeric id as written to replay logs.
    pub fn id(self) -> u8 {
        match self {
            MouseButton::Primary => 1,
            MouseButton::Middle => 2,
            MouseButton::Secondary => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(MouseButton::Primary),
            2 => Some(MouseButton::Middle),
            3 => Some(MouseButton::Secondary),
            _ => None,
        }
    }

    /// Button a touch gesture acts as: one finger drags, two fingers behave
    /// like the middle button.
    pub fn from_pointer_count(count: u8) -> Self {
        if count >= 2 {
            MouseButton::Middle
        } else {
            MouseButton::Primary
        }
    }

    /// Convert a winit button; back/forward/other buttons have no meaning here.
    pub fn from_winit(button: winit::event::MouseButton) -> Option<Self> {
        match button {
            winit::event::MouseButton::Left => Some(MouseButton::Primary),
            winit::event::MouseButton::Middle => Some(MouseButton::Middle),
            winit::event::MouseButton::Right => Some(MouseButton::Secondary),
            _ => None,
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl Modifiers {
    const SHIFT: u8 = 1;
    const ALT: u8 = 2;
    const CTRL: u8 = 4;

    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
    };

    /// Pack into the bit set stored in replay logs.
    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.shift {
            bits |= Self::SHIFT;
        }
        if self.alt {
            bits |= Self::ALT;
        }
        if self.ctrl {
            bits |= Self::CTRL;
        }
        bits
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            shift: bits & Self::SHIFT != 0,
            alt: bits & Self::ALT != 0,
            ctrl: bits & Self::CTRL != 0,
        }
    }
}

impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        Self {
            shift: state.shift_key(),
            alt: state.alt_key(),
            // Cmd plays the ctrl role on macOS
            ctrl: state.control_key() || state.super_key(),
        }
    }
}

/// Kind of a canonical device event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    Down,
    Move,
    Up,
    /// Zoom step; positive zooms in.
    Wheel(f32),
    DoubleActivate,
}

/// A canonical device event. One instance per dispatched step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub kind: EventKind,
    /// Page-space position for live input, surface-space for replayed input.
    pub position: Point,
    /// Button identity; only meaningful on `Down`.
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
    /// Number of active pointers, capped at 2 by the gesture normalizer.
    pub pointer_count: u8,
}

impl DeviceEvent {
    pub fn down(position: Point, button: MouseButton, modifiers: Modifiers) -> Self {
        Self {
            kind: EventKind::Down,
            position,
            button: Some(button),
            modifiers,
            pointer_count: 1,
        }
    }

    pub fn moved(position: Point, modifiers: Modifiers) -> Self {
        Self {
            kind: EventKind::Move,
            position,
            button: None,
            modifiers,
            pointer_count: 1,
        }
    }

    pub fn up(position: Point) -> Self {
        Self {
            kind: EventKind::Up,
            position,
            button: None,
            modifiers: Modifiers::NONE,
            pointer_count: 1,
        }
    }

    pub fn wheel(delta: f32) -> Self {
        Self {
            kind: EventKind::Wheel(delta),
            position: Point::ZERO,
            button: None,
            modifiers: Modifiers::NONE,
            pointer_count: 1,
        }
    }

    pub fn double_activate(position: Point) -> Self {
        Self {
            kind: EventKind::DoubleActivate,
            position,
            button: None,
            modifiers: Modifiers::NONE,
            pointer_count: 1,
        }
    }

    /// Same event with a different pointer count.
    pub fn with_pointer_count(mut self, count: u8) -> Self {
        self.pointer_count = count;
        self
    }
}

/// Reduce a scroll delta to a unit zoom step, like a wheel notch.
///
/// Returns `None` for a zero delta.
pub fn wheel_direction(delta: MouseScrollDelta) -> Option<f32> {
    let y = match delta {
        MouseScrollDelta::LineDelta(_, y) => y as f64,
        MouseScrollDelta::PixelDelta(pos) => pos.y,
    };
    if y > 0.0 {
        Some(1.0)
    } else if y < 0.0 {
        Some(-1.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_button_ids_roundtrip() {
        for button in [MouseButton::Primary, MouseButton::Middle, MouseButton::Secondary] {
            assert_eq!(MouseButton::from_id(button.id()), Some(button));
        }
        assert_eq!(MouseButton::from_id(0), None);
        assert_eq!(MouseButton::from_id(4), None);
    }

    #[test]
    fn test_button_from_pointer_count() {
        assert_eq!(MouseButton::from_pointer_count(1), MouseButton::Primary);
        assert_eq!(MouseButton::from_pointer_count(2), MouseButton::Middle);
    }

    #[test]
    fn test_button_from_winit() {
        assert_eq!(
            MouseButton::from_winit(winit::event::MouseButton::Right),
            Some(MouseButton::Secondary)
        );
        assert_eq!(MouseButton::from_winit(winit::event::MouseButton::Back), None);
    }

    #[test]
    fn test_modifier_bits() {
        let mods = Modifiers {
            shift: true,
            alt: false,
            ctrl: true,
        };
        assert_eq!(mods.bits(), 5);
        assert_eq!(Modifiers::from_bits(5), mods);
        assert_eq!(Modifiers::from_bits(0), Modifiers::NONE);
    }

    #[test]
    fn test_modifiers_from_winit() {
        let mods = Modifiers::from(ModifiersState::SHIFT | ModifiersState::ALT);
        assert!(mods.shift);
        assert!(mods.alt);
        assert!(!mods.ctrl);

        assert!(Modifiers::from(ModifiersState::SUPER).ctrl);
    }

    #[test]
    fn test_wheel_direction() {
        assert_eq!(wheel_direction(MouseScrollDelta::LineDelta(0.0, 3.0)), Some(1.0));
        assert_eq!(
            wheel_direction(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -12.0))),
            Some(-1.0)
        );
        assert_eq!(wheel_direction(MouseScrollDelta::LineDelta(1.0, 0.0)), None);
    }
}
