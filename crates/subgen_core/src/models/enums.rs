//! Core enums used throughout the pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Container format of an uploaded video.
///
/// These are the only formats the render service accepts; anything else
/// is rejected client-side before a byte goes over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    Mp4,
    Mov,
    Avi,
}

impl VideoFormat {
    /// Get all accepted formats.
    pub fn all() -> &'static [VideoFormat] {
        &[Self::Mp4, Self::Mov, Self::Avi]
    }

    /// The file extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
        }
    }

    /// MIME type used for multipart upload parts.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mov => "video/quicktime",
            Self::Avi => "video/x-msvideo",
        }
    }

    /// Detect the format from a file path's extension (case-insensitive).
    ///
    /// Returns `None` for unsupported or missing extensions.
    pub fn from_path(path: &Path) -> Option<VideoFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp4" => Some(Self::Mp4),
            "mov" => Some(Self::Mov),
            "avi" => Some(Self::Avi),
            _ => None,
        }
    }
}

impl std::fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// How the active subtitle source was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleOrigin {
    /// Produced by automatic transcription.
    Generated,
    /// Supplied by the user as a ready-made subtitle file.
    Uploaded,
}

impl std::fmt::Display for SubtitleOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleOrigin::Generated => write!(f, "generated"),
            SubtitleOrigin::Uploaded => write!(f, "uploaded"),
        }
    }
}

/// Kind of downloadable render artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The final video with burned-in captions.
    Video,
    /// The subtitle timing file.
    Srt,
}

impl ArtifactKind {
    /// Path segment used by the download endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Srt => "srt",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check whether a path names an `.srt` subtitle file (case-insensitive).
pub fn is_srt_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("srt"))
}
