//! Variant storage: one file per cache key on durable disk.
//!
//! The store is deliberately dumb — it maps keys to paths and does plain
//! filesystem operations. All invalidation intelligence lives in the
//! [`reaper`](crate::reaper) and [`sweep`](crate::sweep) modules; the
//! orchestrator composes them.
//!
//! The cache directory holds variant files (`{key}.{ext}`), the sweep
//! marker (`autoclean.txt`) and a guard file (`index.html`) written at
//! directory creation so a misconfigured static server won't expose a
//! directory listing of the cache.

use crate::imaging::OutputFormat;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Guard artifact written when the cache directory is first created.
pub const GUARD_FILENAME: &str = "index.html";

const GUARD_CONTENT: &str = "<!doctype html>\n<meta http-equiv=\"refresh\" content=\"0; url=/\">\n";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cache directory unavailable: {path}: {reason}")]
    CacheDirUnavailable { path: PathBuf, reason: String },
    #[error("failed to write variant {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle to the cache directory.
#[derive(Debug, Clone)]
pub struct VariantStore {
    cache_dir: PathBuf,
}

impl VariantStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Create the cache directory (with parents) if missing.
    ///
    /// On first creation the guard file is written alongside. An existing
    /// path that is not a directory is fatal.
    pub fn ensure_cache_dir(&self) -> Result<(), StoreError> {
        if self.cache_dir.exists() {
            if !self.cache_dir.is_dir() {
                return Err(StoreError::CacheDirUnavailable {
                    path: self.cache_dir.clone(),
                    reason: "exists but is not a directory".to_string(),
                });
            }
            return Ok(());
        }

        std::fs::create_dir_all(&self.cache_dir).map_err(|e| StoreError::CacheDirUnavailable {
            path: self.cache_dir.clone(),
            reason: e.to_string(),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Owner-writable, world-readable so the web server can serve variants
            let _ = std::fs::set_permissions(
                &self.cache_dir,
                std::fs::Permissions::from_mode(0o755),
            );
        }

        let guard = self.cache_dir.join(GUARD_FILENAME);
        if let Err(e) = std::fs::write(&guard, GUARD_CONTENT) {
            warn!(path = %guard.display(), error = %e, "could not write cache guard file");
        }
        Ok(())
    }

    /// Path a variant for this key and format would live at.
    pub fn variant_path(&self, key: &str, format: OutputFormat) -> PathBuf {
        self.cache_dir.join(format!("{key}.{}", format.ext()))
    }

    /// Existence check only; content is never validated.
    pub fn lookup(&self, key: &str, format: OutputFormat) -> Option<PathBuf> {
        let path = self.variant_path(key, format);
        path.is_file().then_some(path)
    }

    /// Write a freshly rendered variant.
    pub fn persist(
        &self,
        key: &str,
        format: OutputFormat,
        bytes: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let path = self.variant_path(key, format);
        std::fs::write(&path, bytes).map_err(|e| StoreError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Remove a file if present. Returns whether a file was actually removed.
    ///
    /// A missing file is a no-op — concurrent reapers and sweeps routinely
    /// race on the same entries. Other I/O failures are logged and swallowed;
    /// cleanup is opportunistic maintenance, never worth failing a request.
    pub fn delete(&self, path: &Path) -> bool {
        match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete cache file");
                false
            }
        }
    }
}
