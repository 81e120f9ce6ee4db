//! SculptKit Core Library
//!
//! Interaction dispatch and deterministic session replay for a 3D sculpting
//! editor. Rendering, picking, brushes and mesh I/O are supplied by the host
//! through the traits in [`collaborators`].

pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod files;
pub mod gesture;
pub mod input;
pub mod math;
pub mod mode;
pub mod replay;
pub mod session;
pub mod timer;
pub mod trace;

pub use collaborators::{Collaborators, MeshId, PickHit, RenderHint};
pub use config::{ConfigError, InteractionConfig};
pub use dispatch::Dispatcher;
pub use files::FileType;
pub use gesture::{GestureNormalizer, TouchSample};
pub use input::{DeviceEvent, EventKind, Modifiers, MouseButton};
pub use mode::InteractionMode;
pub use replay::{Player, Recorder, ReplayError, ReplayLog};
pub use session::{InputScope, Session, SessionError};
