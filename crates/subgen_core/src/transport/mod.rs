//! Transport adapter for the remote subtitle service.
//!
//! A typed wrapper over the service's operations. Each call returns a
//! result or a typed failure; nothing is retried automatically. Timeout
//! policy is per operation and owned by the implementation.

mod http;
#[cfg(test)]
pub(crate) mod mock;
mod wire;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ArtifactKind, StyleSpec};

pub use http::HttpTransport;
pub use wire::{
    FinalRenderAck, HealthStatus, SubtitleUploadAck, TranscribeResponse, UploadAck, WireSegment,
};

/// Sink for fractional upload progress, fed 0-100 percent values.
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// The remote operations, used to key timeouts and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    Transcribe,
    UploadSubtitles,
    RenderPreview,
    RenderFinal,
    Download,
    Health,
}

impl Operation {
    /// Generic human-readable failure text for when the server sends no
    /// detail of its own.
    pub fn generic_message(&self) -> &'static str {
        match self {
            Self::Upload => "Video upload failed",
            Self::Transcribe => "Transcription failed",
            Self::UploadSubtitles => "Subtitle upload failed",
            Self::RenderPreview => "Preview generation failed",
            Self::RenderFinal => "Video rendering failed",
            Self::Download => "Artifact download failed",
            Self::Health => "Service health check failed",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Upload => "video upload",
            Self::Transcribe => "transcription",
            Self::UploadSubtitles => "subtitle upload",
            Self::RenderPreview => "preview render",
            Self::RenderFinal => "final render",
            Self::Download => "artifact download",
            Self::Health => "health check",
        };
        write!(f, "{name}")
    }
}

/// Errors surfaced by transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The call exceeded its per-operation bound.
    #[error("{operation} timed out")]
    Timeout { operation: Operation },

    /// The call failed below the HTTP layer or with a malformed body.
    #[error("{operation} failed: {message}")]
    Network { operation: Operation, message: String },

    /// The server answered with a failure response.
    #[error("{}", detail.as_deref().unwrap_or(operation.generic_message()))]
    Server {
        operation: Operation,
        status: u16,
        detail: Option<String>,
    },

    /// A local file could not be read for sending.
    #[error("Failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to initialize HTTP client: {message}")]
    Client { message: String },
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// The remote operation surface.
///
/// Implementations own per-call timeout policy; callers own sequencing.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload a video file, reporting fractional progress to `progress`.
    async fn upload(&self, file: &Path, progress: ProgressSink) -> TransportResult<UploadAck>;

    /// Request automatic transcription of an uploaded video.
    ///
    /// `language` is a hint; `None` lets the service detect it.
    async fn transcribe(
        &self,
        video_id: &str,
        language: Option<&str>,
    ) -> TransportResult<TranscribeResponse>;

    /// Replace the asset's subtitle track with a ready-made file.
    async fn upload_subtitles(
        &self,
        video_id: &str,
        file: &Path,
    ) -> TransportResult<SubtitleUploadAck>;

    /// Render a short styled sample and return the clip bytes.
    async fn render_preview(&self, video_id: &str, style: &StyleSpec) -> TransportResult<Vec<u8>>;

    /// Kick off the full render; the artifact is fetched separately via
    /// `download`.
    async fn render_final(
        &self,
        video_id: &str,
        style: &StyleSpec,
    ) -> TransportResult<FinalRenderAck>;

    /// Fetch a finished artifact's bytes.
    async fn download(&self, video_id: &str, kind: ArtifactKind) -> TransportResult<Vec<u8>>;

    /// Probe service reachability.
    async fn health(&self) -> TransportResult<HealthStatus>;
}
