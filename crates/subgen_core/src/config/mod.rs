//! Configuration management.
//!
//! Settings are organized into TOML sections with serde-applied defaults;
//! the manager handles load-or-create and atomic writes.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    PathSettings, ServerSettings, Settings, TimeoutSettings, UploadSettings,
};
