//! Wire-format payloads exchanged with the subtitle service.
//!
//! These mirror the service's JSON bodies verbatim; converters turn them
//! into the session models.

use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{SubtitleOrigin, SubtitleSegment, SubtitleSource};

/// Response to a successful video upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAck {
    pub video_id: String,
    pub filename: String,
    pub size_mb: f64,
    /// Extension with its leading dot, e.g. ".mp4".
    pub format: String,
    /// Duration in seconds; 0.0 when the service could not probe it.
    #[serde(default)]
    pub duration: f64,
}

/// One transcription segment as sent by the service.
///
/// The service emits both `start`/`end` floats and a `timestamp` pair for
/// compatibility; either form is accepted, `start`/`end` preferred.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSegment {
    pub text: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<(f64, f64)>,
}

impl WireSegment {
    /// Convert into a session segment; `None` if no timing is present.
    pub fn into_segment(self) -> Option<SubtitleSegment> {
        let (start_secs, end_secs) = match (self.start, self.end, self.timestamp) {
            (Some(start), Some(end), _) => (start, end),
            (_, _, Some((start, end))) => (start, end),
            _ => return None,
        };
        Some(SubtitleSegment {
            start_secs,
            end_secs,
            text: self.text,
        })
    }
}

/// Response to a successful transcription.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeResponse {
    pub video_id: String,
    /// The full transcript as one string.
    #[serde(default)]
    pub transcription: String,
    pub segments: Vec<WireSegment>,
    #[serde(default)]
    pub language: String,
    /// Server-side subtitle filename, e.g. "{video_id}.srt".
    #[serde(default)]
    pub srt_file: String,
}

impl TranscribeResponse {
    /// Convert into the session's subtitle source.
    ///
    /// Segments without any timing information are dropped with a warning
    /// rather than failing the whole transcription.
    pub fn into_source(self) -> SubtitleSource {
        let total = self.segments.len();
        let segments: Vec<SubtitleSegment> = self
            .segments
            .into_iter()
            .filter_map(WireSegment::into_segment)
            .collect();

        if segments.len() < total {
            tracing::warn!(
                dropped = total - segments.len(),
                "transcription segments without timing were dropped"
            );
        }

        SubtitleSource {
            origin: SubtitleOrigin::Generated,
            segments,
            language: self.language,
        }
    }
}

/// Acknowledgement of a subtitle file upload.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleUploadAck {
    #[serde(default)]
    pub message: String,
    pub video_id: String,
}

/// Acknowledgement of a final render; the artifact itself is fetched via
/// the download endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalRenderAck {
    pub video_id: String,
    #[serde(default)]
    pub output_file: String,
    pub download_url: String,
    #[serde(default)]
    pub message: String,
}

/// Service health probe response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub services: HashMap<String, String>,
}

impl HealthStatus {
    /// Whether the service reports itself ready for work.
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
