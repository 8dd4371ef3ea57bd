//! Cache key derivation for image variants.
//!
//! A variant key binds together everything that makes a cached file valid:
//!
//! ```text
//! {sanitized base}-{width}[x{height}]-{digest}
//! photo-400-3a7bd3e2360a3d29eea436fcfb7e44c7    (width only)
//! photo-400x300-3a7bd3e2360a3d29eea436fcfb7e44c7 (explicit height)
//! ```
//!
//! - **base**: source file stem with every character outside `[A-Za-z0-9_-]`
//!   stripped, so keys are always safe as filenames.
//! - **dimensions**: the `x{height}` part appears only when the request named
//!   a height explicitly. A derived-from-aspect height is *not* part of the
//!   key — the same source at the same width always maps to one variant.
//! - **digest**: SHA-256 of the source bytes. Content-based rather than
//!   mtime-based so it survives `git checkout` and rsync. Any change to the
//!   source bytes changes the key even when dimensions are identical.
//!
//! Keys are also parsed back into [`KeyParts`] by the reaper, which compares
//! fields exactly instead of substring-matching prefixes (a `photo-400`
//! variant must never match `photo-4000`).

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Hex length of a SHA-256 digest; used to recognize the digest segment.
const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 of a byte buffer as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// Source file stem reduced to `[A-Za-z0-9_-]`.
///
/// May be empty when the stem has no representable characters; the key is
/// still unambiguous because width and digest always follow.
pub fn sanitize_base(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Derive the variant key for a source at the given effective dimensions.
///
/// Deterministic: identical source bytes and dimensions always yield the
/// identical key.
pub fn derive_key(
    source: &Path,
    effective_width: u32,
    explicit_height: Option<u32>,
    digest: &str,
) -> String {
    let base = sanitize_base(source);
    match explicit_height {
        Some(h) => format!("{base}-{effective_width}x{h}-{digest}"),
        None => format!("{base}-{effective_width}-{digest}"),
    }
}

/// A variant key decomposed into its structured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    pub base: String,
    pub width: u32,
    pub height: Option<u32>,
    pub digest: String,
}

impl KeyParts {
    /// Parse a key (a variant filename without its extension).
    ///
    /// Returns `None` for names that don't follow the current scheme — the
    /// reaper treats those as leftovers from an older naming convention.
    pub fn parse(stem: &str) -> Option<Self> {
        let (rest, digest) = stem.rsplit_once('-')?;
        if digest.len() != DIGEST_HEX_LEN || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let (base, dims) = rest.rsplit_once('-')?;
        let (width, height) = match dims.split_once('x') {
            Some((w, h)) => (w.parse().ok()?, Some(h.parse().ok()?)),
            None => (dims.parse().ok()?, None),
        };

        Some(Self {
            base: base.to_string(),
            width,
            height,
            digest: digest.to_string(),
        })
    }

    /// The key stem shared by all digests of this base + dimensions,
    /// including the trailing separator (`photo-400-`). Exact-prefix form
    /// used to recognize old-scheme leftovers without substring ambiguity.
    pub fn stale_prefix(&self) -> String {
        match self.height {
            Some(h) => format!("{}-{}x{}-", self.base, self.width, h),
            None => format!("{}-{}-", self.base, self.width),
        }
    }
}
