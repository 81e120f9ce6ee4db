//! Interaction modes and the table that picks one on pointer down.

use crate::input::{Modifiers, MouseButton};
use serde::{Deserialize, Serialize};

/// The single behavior bound to the current Down..Up span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InteractionMode {
    /// No pointer is down.
    #[default]
    Idle,
    /// Brush stroke on the picked mesh.
    Sculpt,
    /// Alt-drag camera pan.
    PanDrag,
    RotateCamera,
    /// Ctrl + secondary drag zoom.
    ZoomDrag,
    /// Middle button (or two-finger) pan.
    PanWheel,
    /// Ctrl-drag outside any mesh; click inverts the mask, drag clears it.
    MaskEdit,
}

impl InteractionMode {
    /// Modes that start the camera's drag tracking on Down.
    pub fn tracks_camera(self) -> bool {
        matches!(self, InteractionMode::RotateCamera | InteractionMode::ZoomDrag)
    }

    pub fn is_idle(self) -> bool {
        self == InteractionMode::Idle
    }
}

/// Resolve the mode for a Down. Rows are evaluated top to bottom and the
/// first match wins.
pub fn resolve_mode(button: MouseButton, modifiers: Modifiers, picked: bool) -> InteractionMode {
    let secondary = button == MouseButton::Secondary;

    if secondary && modifiers.ctrl {
        InteractionMode::ZoomDrag
    } else if button == MouseButton::Middle {
        InteractionMode::PanWheel
    } else if !picked && modifiers.ctrl {
        InteractionMode::MaskEdit
    } else if (!picked || secondary) && modifiers.alt {
        InteractionMode::PanDrag
    } else if secondary || !picked {
        InteractionMode::RotateCamera
    } else {
        InteractionMode::Sculpt
    }
}
