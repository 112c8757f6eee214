//! Data models for subgen.
//!
//! This module contains the core data structures shared across the pipeline:
//! - Enums for video formats, subtitle origins, artifact kinds
//! - Media structures (video assets, subtitle sources and segments)
//! - Style specification for caption rendering

mod enums;
mod media;
mod style;

// Re-export all public types
pub use enums::{is_srt_path, ArtifactKind, SubtitleOrigin, VideoFormat};
pub use media::{RenderArtifact, SubtitleSegment, SubtitleSource, VideoAsset};
pub use style::StyleSpec;
