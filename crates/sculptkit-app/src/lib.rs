//! SculptKit application shell.
//!
//! Runs recorded sessions against tracing collaborators and reports every
//! call the dispatcher makes.

mod app;
pub mod cli;

pub use app::{App, AppConfig, AppError};
