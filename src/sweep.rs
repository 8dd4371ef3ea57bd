//! Time-gated full-cache sweep.
//!
//! The sweep is the coarse counterpart to the per-source reaper: every
//! `interval_days` the whole cache directory is purged, bounding disk use by
//! variants whose sources were deleted and will never be requested again.
//! The last sweep time is recorded as a single integer Unix timestamp in
//! `autoclean.txt` inside the cache directory itself, so the gate needs no
//! database and works across process restarts.
//!
//! The purge is unconditional and deletes *every* file in the directory,
//! including the guard file and any variant another request just wrote.
//! That's accepted: the operation is infrequent, and every consumer of the
//! cache treats a missing file as a plain miss.

use crate::store::{StoreError, VariantStore};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Marker file recording the last sweep time.
pub const MARKER_FILENAME: &str = "autoclean.txt";

const SECONDS_PER_DAY: i64 = 86_400;

/// What a sweep check decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Auto-clean is disabled.
    Disabled,
    /// No marker existed; a baseline timestamp was written, nothing purged.
    BaselineWritten,
    /// The interval has not elapsed yet.
    Skipped,
    /// Full purge ran; `deleted` counts removed files (marker excluded).
    Swept { deleted: usize },
}

/// Gate around the full-cache purge.
#[derive(Debug, Clone)]
pub struct SweepGate {
    store: VariantStore,
}

impl SweepGate {
    pub fn new(store: VariantStore) -> Self {
        Self { store }
    }

    fn marker_path(&self) -> PathBuf {
        self.store.cache_dir().join(MARKER_FILENAME)
    }

    /// Read the marker. An unreadable or unparseable marker counts as
    /// missing — the gate re-establishes a baseline rather than purging on
    /// garbage input.
    fn read_marker(&self) -> Option<i64> {
        let content = std::fs::read_to_string(self.marker_path()).ok()?;
        content.trim().parse().ok()
    }

    fn write_marker(&self, timestamp: i64) -> Result<(), StoreError> {
        let path = self.marker_path();
        std::fs::write(&path, timestamp.to_string()).map_err(|e| StoreError::WriteFailed {
            path,
            source: e,
        })
    }

    /// Run the sweep if it is enabled and due.
    ///
    /// The first check after directory creation only records a baseline;
    /// purging starts one full interval later. Executes at most once per
    /// interval regardless of how many misses trigger the check.
    pub fn maybe_sweep(
        &self,
        enabled: bool,
        interval_days: u32,
    ) -> Result<SweepOutcome, StoreError> {
        if !enabled {
            return Ok(SweepOutcome::Disabled);
        }

        let now = chrono::Utc::now().timestamp();
        let Some(last) = self.read_marker() else {
            self.write_marker(now)?;
            debug!("sweep baseline established");
            return Ok(SweepOutcome::BaselineWritten);
        };

        if now - last < interval_days as i64 * SECONDS_PER_DAY {
            return Ok(SweepOutcome::Skipped);
        }

        let deleted = self.purge_all();
        self.write_marker(now)?;
        info!(deleted, "cache sweep executed");
        Ok(SweepOutcome::Swept { deleted })
    }

    /// Unconditional purge: delete every cache file and reset the marker to
    /// now, regardless of the auto-clean setting. Idempotent.
    pub fn force_clear(&self) -> Result<usize, StoreError> {
        let deleted = self.purge_all();
        self.write_marker(chrono::Utc::now().timestamp())?;
        info!(deleted, "cache force-cleared");
        Ok(deleted)
    }

    /// Delete every file in the cache directory. Subdirectories are left
    /// alone; the cache is flat by construction. Returns the number removed.
    fn purge_all(&self) -> usize {
        let entries = match std::fs::read_dir(self.store.cache_dir()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cannot scan cache directory for sweep");
                return 0;
            }
        };

        let mut deleted = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && self.store.delete(&path) {
                deleted += 1;
            }
        }
        deleted
    }
}
