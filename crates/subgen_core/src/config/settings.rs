//! Settings struct with TOML-based sections.
//!
//! Each section maps to a TOML table. Every field carries a serde default
//! so a partial config file (or none at all) always produces a complete,
//! usable `Settings`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Render service endpoint.
    #[serde(default)]
    pub server: ServerSettings,

    /// Upload validation limits.
    #[serde(default)]
    pub upload: UploadSettings,

    /// Per-operation timeouts.
    #[serde(default)]
    pub timeouts: TimeoutSettings,

    /// Local paths.
    #[serde(default)]
    pub paths: PathSettings,
}

/// Render service endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the subtitle service, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Upload validation limits, checked locally before any network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Maximum accepted video size in megabytes.
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

fn default_max_size_mb() -> u64 {
    500
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl UploadSettings {
    /// The size ceiling in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

/// Per-operation timeouts in seconds.
///
/// Transcription and final rendering are minutes-scale; everything else
/// is tight enough that a stuck call surfaces quickly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_upload_secs")]
    pub upload_secs: u64,

    #[serde(default = "default_transcribe_secs")]
    pub transcribe_secs: u64,

    #[serde(default = "default_subtitle_upload_secs")]
    pub subtitle_upload_secs: u64,

    #[serde(default = "default_preview_secs")]
    pub preview_secs: u64,

    #[serde(default = "default_render_secs")]
    pub render_secs: u64,

    #[serde(default = "default_download_secs")]
    pub download_secs: u64,
}

fn default_upload_secs() -> u64 {
    30
}

fn default_transcribe_secs() -> u64 {
    300
}

fn default_subtitle_upload_secs() -> u64 {
    15
}

fn default_preview_secs() -> u64 {
    60
}

fn default_render_secs() -> u64 {
    300
}

fn default_download_secs() -> u64 {
    120
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            upload_secs: default_upload_secs(),
            transcribe_secs: default_transcribe_secs(),
            subtitle_upload_secs: default_subtitle_upload_secs(),
            preview_secs: default_preview_secs(),
            render_secs: default_render_secs(),
            download_secs: default_download_secs(),
        }
    }
}

impl TimeoutSettings {
    pub fn upload(&self) -> Duration {
        Duration::from_secs(self.upload_secs)
    }

    pub fn transcribe(&self) -> Duration {
        Duration::from_secs(self.transcribe_secs)
    }

    pub fn subtitle_upload(&self) -> Duration {
        Duration::from_secs(self.subtitle_upload_secs)
    }

    pub fn preview(&self) -> Duration {
        Duration::from_secs(self.preview_secs)
    }

    pub fn render(&self) -> Duration {
        Duration::from_secs(self.render_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }
}

/// Local path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder downloaded artifacts are written into.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,
}

fn default_output_folder() -> String {
    "subgen_output".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
        }
    }
}
