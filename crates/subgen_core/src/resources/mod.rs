//! Ephemeral media handle lifecycle.
//!
//! Binary results (the preview clip) have to live somewhere the host can
//! play them from; that somewhere is a temp file. Every acquisition
//! registers its release path at creation, so a handle is released
//! exactly once on whichever comes first: explicit dismissal, a new
//! acquisition of the same kind, `release_all()`, or manager drop.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use thiserror::Error;

/// Errors from acquiring or releasing a media handle.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Failed to materialize {kind} media: {source}")]
    Acquire {
        kind: MediaHandleKind,
        #[source]
        source: io::Error,
    },

    #[error("Failed to release {kind} media: {source}")]
    Release {
        kind: MediaHandleKind,
        #[source]
        source: io::Error,
    },
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Kind of ephemeral media a handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaHandleKind {
    /// A playable preview clip.
    Preview,
}

impl MediaHandleKind {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Preview => "subgen_preview_",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Preview => ".mp4",
        }
    }
}

impl std::fmt::Display for MediaHandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaHandleKind::Preview => write!(f, "preview"),
        }
    }
}

/// A materialized media file with its registered release path.
///
/// Dropping the handle deletes the backing file.
struct MediaHandle {
    path: PathBuf,
    temp: TempPath,
}

/// Owns all ephemeral media handles for one pipeline session.
#[derive(Default)]
pub struct ResourceManager {
    handles: HashMap<MediaHandleKind, MediaHandle>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write preview bytes into a fresh temp file and register it.
    ///
    /// Any prior preview handle is released first (superseded). Returns
    /// the playable path; the file stays alive until the handle is
    /// released.
    pub fn acquire_preview(&mut self, bytes: &[u8]) -> ResourceResult<PathBuf> {
        self.acquire(MediaHandleKind::Preview, bytes)
    }

    fn acquire(&mut self, kind: MediaHandleKind, bytes: &[u8]) -> ResourceResult<PathBuf> {
        let mut file = Builder::new()
            .prefix(kind.prefix())
            .suffix(kind.suffix())
            .tempfile()
            .map_err(|source| ResourceError::Acquire { kind, source })?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|source| ResourceError::Acquire { kind, source })?;

        let temp = file.into_temp_path();
        let path = temp.to_path_buf();

        // Supersede: the old handle of this kind is released before the
        // new one is installed.
        if let Some(old) = self.handles.remove(&kind) {
            release_handle(kind, old)?;
        }

        tracing::debug!(%kind, path = %path.display(), "acquired media handle");
        self.handles.insert(kind, MediaHandle { path: path.clone(), temp });

        Ok(path)
    }

    /// Path of the currently held handle of `kind`, if any.
    pub fn path(&self, kind: MediaHandleKind) -> Option<&Path> {
        self.handles.get(&kind).map(|h| h.path.as_path())
    }

    /// Release the handle of `kind`.
    ///
    /// Returns `Ok(false)` if no such handle was held (releasing twice is
    /// a no-op, not an error).
    pub fn release(&mut self, kind: MediaHandleKind) -> ResourceResult<bool> {
        match self.handles.remove(&kind) {
            Some(handle) => {
                release_handle(kind, handle)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Release every held handle. Called on `reset()`.
    pub fn release_all(&mut self) {
        for (kind, handle) in self.handles.drain() {
            if let Err(e) = release_handle(kind, handle) {
                tracing::warn!(%kind, "failed to release media handle: {e}");
            }
        }
    }

    /// Number of live handles (leak checks in tests).
    pub fn active_handles(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn release_handle(kind: MediaHandleKind, handle: MediaHandle) -> ResourceResult<()> {
    tracing::debug!(%kind, path = %handle.path.display(), "releasing media handle");
    handle
        .temp
        .close()
        .map_err(|source| ResourceError::Release { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_a_playable_file() {
        let mut manager = ResourceManager::new();
        let path = manager.acquire_preview(b"clip bytes").unwrap();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"clip bytes");
        assert_eq!(manager.active_handles(), 1);
        assert_eq!(manager.path(MediaHandleKind::Preview), Some(path.as_path()));
    }

    #[test]
    fn new_acquisition_supersedes_the_old_handle() {
        let mut manager = ResourceManager::new();
        let first = manager.acquire_preview(b"one").unwrap();
        let second = manager.acquire_preview(b"two").unwrap();

        assert!(!first.exists(), "superseded preview was not released");
        assert!(second.exists());
        assert_eq!(manager.active_handles(), 1);
    }

    #[test]
    fn release_fires_exactly_once() {
        let mut manager = ResourceManager::new();
        let path = manager.acquire_preview(b"bytes").unwrap();

        assert!(manager.release(MediaHandleKind::Preview).unwrap());
        assert!(!path.exists());

        // Second release is a no-op
        assert!(!manager.release(MediaHandleKind::Preview).unwrap());
        assert_eq!(manager.active_handles(), 0);
    }

    #[test]
    fn release_all_clears_everything() {
        let mut manager = ResourceManager::new();
        let path = manager.acquire_preview(b"bytes").unwrap();

        manager.release_all();
        assert!(!path.exists());
        assert_eq!(manager.active_handles(), 0);
    }

    #[test]
    fn dropping_the_manager_releases_handles() {
        let path;
        {
            let mut manager = ResourceManager::new();
            path = manager.acquire_preview(b"bytes").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists(), "manager drop leaked the preview file");
    }
}
