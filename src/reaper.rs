//! Stale variant eviction.
//!
//! Runs once per cache miss, before the new variant is rendered: any sibling
//! variant of the same source and dimensions whose content digest no longer
//! matches is deleted. This is what keeps exactly one live variant per
//! (source, dimensions) pair — when a source image is re-exported, its old
//! variants disappear on the next request instead of rotting on disk.
//!
//! Staleness is decided by exact field comparison on parsed
//! [`KeyParts`](crate::key::KeyParts): same base, same width, same height,
//! different digest. The historical implementation substring-matched a
//! truncated key prefix, which cross-matched numerically adjacent sizes
//! (`photo-400` vs `photo-4000`); parsing into structured fields removes
//! that ambiguity. Names that share the exact `{base}-{dims}-` stem but do
//! not parse under the current scheme are treated as leftovers from an older
//! naming convention and deleted as well.

use crate::key::KeyParts;
use crate::store::{GUARD_FILENAME, VariantStore};
use crate::sweep::MARKER_FILENAME;
use tracing::{debug, warn};

/// Delete stale siblings of `current_key` from the cache directory.
///
/// Returns the number of files removed. The sweep marker and guard file are
/// never touched. Scan errors are logged and reported as zero deletions —
/// eviction is best-effort maintenance on the miss path.
pub fn reap(store: &VariantStore, current_key: &str) -> usize {
    let Some(current) = KeyParts::parse(current_key) else {
        warn!(key = current_key, "unparseable variant key, skipping reap");
        return 0;
    };
    let prefix = current.stale_prefix();

    let entries = match std::fs::read_dir(store.cache_dir()) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "cannot scan cache directory for reaping");
            return 0;
        }
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name == MARKER_FILENAME || name == GUARD_FILENAME {
            continue;
        }

        let stem = name.rsplit_once('.').map_or(name, |(stem, _ext)| stem);
        if stem == current_key {
            continue;
        }

        if is_stale(&current, &prefix, stem) && store.delete(&path) {
            debug!(file = name, "reaped stale variant");
            deleted += 1;
        }
    }
    deleted
}

/// A candidate stem is stale when it names the same source and dimensions
/// with a different digest, or when it carries the exact current stem prefix
/// but follows an older naming scheme.
fn is_stale(current: &KeyParts, prefix: &str, stem: &str) -> bool {
    match KeyParts::parse(stem) {
        Some(candidate) => {
            candidate.base == current.base
                && candidate.width == current.width
                && candidate.height == current.height
                && candidate.digest != current.digest
        }
        None => stem.starts_with(prefix),
    }
}
