//! Pipeline stage machine and the observable state snapshot.

use serde::{Deserialize, Serialize};

/// Discrete stage of the pipeline state machine.
///
/// A tagged union replaces the original flag soup ("uploading" and
/// "transcribing" can no longer both be true). Every stage has a defined
/// exit set, enforced by the controller's intent guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing uploaded yet.
    Idle,
    /// Video upload in flight.
    Uploading,
    /// Video uploaded; waiting for the user to pick a subtitle path.
    Uploaded,
    /// Automatic transcription in flight.
    TranscribingAuto,
    /// Subtitle file upload in flight.
    UploadingSubtitles,
    /// Styled sample render in flight.
    PreviewRendering,
    /// Asset and subtitle source present; renders may be requested.
    Ready,
    /// Full render in flight.
    FinalRendering,
    /// Final render finished; the video artifact is downloadable.
    Complete,
    /// A long operation failed; intents valid at `resume` are accepted.
    Failed { resume: ResumePoint },
}

impl Stage {
    /// Whether a remote operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Stage::Uploading
                | Stage::TranscribingAuto
                | Stage::UploadingSubtitles
                | Stage::PreviewRendering
                | Stage::FinalRendering
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Uploading => write!(f, "uploading"),
            Stage::Uploaded => write!(f, "uploaded"),
            Stage::TranscribingAuto => write!(f, "transcribing"),
            Stage::UploadingSubtitles => write!(f, "uploading subtitles"),
            Stage::PreviewRendering => write!(f, "rendering a preview"),
            Stage::Ready => write!(f, "ready"),
            Stage::FinalRendering => write!(f, "rendering"),
            Stage::Complete => write!(f, "complete"),
            Stage::Failed { resume } => write!(f, "failed (resume: {resume})"),
        }
    }
}

/// The stable stage a failed pipeline resumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePoint {
    Idle,
    Uploaded,
    Ready,
}

impl ResumePoint {
    /// The stage intents are validated against while failed.
    pub fn as_stage(&self) -> Stage {
        match self {
            ResumePoint::Idle => Stage::Idle,
            ResumePoint::Uploaded => Stage::Uploaded,
            ResumePoint::Ready => Stage::Ready,
        }
    }
}

impl std::fmt::Display for ResumePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_stage())
    }
}

/// Availability flags for downloadable artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFlags {
    /// The final subtitled video exists server-side.
    pub video: bool,
    /// A subtitle file exists server-side.
    pub subtitle: bool,
}

/// Taxonomy discriminant carried in the state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Sequence,
    Timeout,
    Network,
    Server,
    Resource,
}

/// Cheap projection of the last error for the state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub kind: ErrorKind,
    pub message: String,
}

/// The single source of truth for what a front-end renders.
///
/// Exactly one instance exists per session; only the controller mutates
/// it, and readers get consistent clones - never a half-updated view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub stage: Stage,
    pub progress_percent: f64,
    pub last_error: Option<LastError>,
    pub artifacts: ArtifactFlags,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            progress_percent: 0.0,
            last_error: None,
            artifacts: ArtifactFlags::default(),
        }
    }
}
