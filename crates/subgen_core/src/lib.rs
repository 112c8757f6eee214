//! Subgen Core - Client-side orchestration for the subtitle burning service
//!
//! This crate contains all business logic with zero UI dependencies.
//! It can be used by the CLI driver or a graphical front-end:
//! - Configuration management
//! - Models (video assets, subtitle sources, style specs)
//! - Transport adapter for the remote render service
//! - Progress estimation for operations without server-pushed progress
//! - Stroke-outline style preview
//! - Ephemeral media handle lifecycle
//! - Pipeline controller (the session state machine)

pub mod config;
pub mod controller;
pub mod models;
pub mod progress;
pub mod resources;
pub mod style;
pub mod transport;

pub use controller::{PipelineController, PipelineError, PipelineState, Stage};
pub use models::{StyleSpec, SubtitleOrigin, SubtitleSource, VideoAsset, VideoFormat};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
