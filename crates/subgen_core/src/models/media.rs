//! Media structures: uploaded assets, subtitle sources, render artifacts.

use serde::{Deserialize, Serialize};

use super::enums::{ArtifactKind, SubtitleOrigin, VideoFormat};

/// A video successfully uploaded to the render service.
///
/// Created once per upload and immutable for the session; `id` is the
/// server-assigned handle every subsequent operation is keyed by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    /// Server-assigned identifier.
    pub id: String,
    /// Original filename as selected by the user.
    pub filename: String,
    /// Size of the local file in bytes.
    pub size_bytes: u64,
    /// Container format.
    pub format: VideoFormat,
    /// Duration reported by the server, in seconds (0.0 if unknown).
    pub duration_secs: f64,
}

impl VideoAsset {
    /// Size in whole megabytes, rounded down (for display).
    pub fn size_mb(&self) -> u64 {
        self.size_bytes / (1024 * 1024)
    }

    /// Filename without its extension, used to name downloaded artifacts.
    pub fn file_stem(&self) -> &str {
        std::path::Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.filename)
    }
}

/// One timed subtitle unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// The active subtitle track for the session's video asset.
///
/// At most one source exists per asset; a new transcription or subtitle
/// upload replaces the previous one (last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSource {
    pub origin: SubtitleOrigin,
    pub segments: Vec<SubtitleSegment>,
    /// Detected or declared language code (e.g. "en", "pl").
    pub language: String,
}

impl SubtitleSource {
    /// Total captioned time across all segments, in seconds.
    pub fn captioned_secs(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| (s.end_secs - s.start_secs).max(0.0))
            .sum()
    }
}

/// Reference to a downloadable server-side render result.
///
/// Existence implies the corresponding render step completed. Never
/// mutated; a re-render with the same kind supersedes the prior artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderArtifact {
    pub kind: ArtifactKind,
    /// Asset the artifact belongs to.
    pub video_id: String,
    /// Server path the artifact can be fetched from.
    pub download_path: String,
}

impl RenderArtifact {
    /// Build the artifact reference for the given asset and kind.
    pub fn new(kind: ArtifactKind, video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        let download_path = format!("/api/download/{}/{}", kind.as_str(), video_id);
        Self {
            kind,
            video_id,
            download_path,
        }
    }
}
