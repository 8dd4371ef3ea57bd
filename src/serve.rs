//! Request orchestration: the per-request state machine.
//!
//! ```text
//! Validate → KeyDerive → Lookup → Hit:  Serve
//!                                 Miss: Reap → Render → Persist → Serve
//! ```
//!
//! Each request runs synchronously to completion. The only cross-process
//! coordination is the shared cache directory itself, so every filesystem
//! read here tolerates files vanishing underneath it (the reaper or a sweep
//! may be deleting concurrently): a missing file degrades to a miss, never
//! to a failure. Within one process, a per-key render guard serializes
//! concurrent misses for the same key so identical work isn't done twice.
//!
//! Served responses carry far-future cache headers (one week) and the MIME
//! type of the *actual output format*. The historical behavior of echoing
//! the source image's MIME even when transcoding (JPEG source served as
//! WebP bytes labeled `image/jpeg`) was a defect and is deliberately fixed.

use crate::config::ServiceConfig;
use crate::imaging::{
    CodecError, Compression, ImageCodec, OutputFormat, Quality, RenderJob,
};
use crate::key;
use crate::reaper;
use crate::store::{StoreError, VariantStore};
use crate::sweep::SweepGate;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// One week, the lifetime advertised in `Cache-Control: max-age`.
const CACHE_MAX_AGE_SECS: i64 = 604_800;

#[derive(Error, Debug)]
pub enum ServeError {
    /// Missing or malformed `src`, cross-origin reference, nonexistent file.
    #[error("invalid request: {0}")]
    InvalidInput(String),
    /// The source exists but is not one of the allowed image types.
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// I/O failure reading back a variant that was just rendered.
    #[error("failed to serve variant: {0}")]
    ServeFailed(String),
}

/// One incoming request, already parsed out of whatever surface carried it.
#[derive(Debug, Clone, Default)]
pub struct ImageRequest {
    /// Same-origin path (or absolute URL) of the source image.
    pub src: String,
    /// Requested width; defaults to the configured width.
    pub width: Option<u32>,
    /// Requested height; derived from the source aspect ratio when absent.
    pub height: Option<u32>,
    /// Short-circuits to a full cache clear.
    pub clear: bool,
}

/// Host the request arrived on, used for the same-origin check.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOrigin<'a> {
    pub host: Option<&'a str>,
}

/// A successfully served variant.
#[derive(Debug, Clone)]
pub struct ServedImage {
    pub bytes: Vec<u8>,
    /// MIME of the encoded output format.
    pub content_type: &'static str,
}

impl ServedImage {
    /// Response headers for this variant: content metadata plus a one-week
    /// public cache policy.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let expires = chrono::Utc::now() + chrono::Duration::seconds(CACHE_MAX_AGE_SECS);
        vec![
            ("Content-Type", self.content_type.to_string()),
            ("Content-Length", self.bytes.len().to_string()),
            (
                "Cache-Control",
                format!("public, max-age={CACHE_MAX_AGE_SECS}"),
            ),
            (
                "Expires",
                expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            ),
            ("Pragma", "public".to_string()),
        ]
    }
}

/// Result of handling one request.
#[derive(Debug)]
pub enum Outcome {
    Image(ServedImage),
    /// A `clear` request ran; reports how many cache files were removed.
    Cleared { deleted: usize },
}

/// Per-key serialization of concurrent renders within this process.
///
/// Two simultaneous misses for the same key would otherwise both decode,
/// crop and encode identical bytes; the second writer wins harmlessly but
/// the work is wasted. The guard hands out one lock per in-flight key. This
/// is an in-process improvement only — across processes the filesystem
/// remains the sole coordinator and last-writer-wins still applies.
#[derive(Default)]
struct RenderGuard {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RenderGuard {
    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.to_string()).or_default().clone()
    }

    fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Drop the map entry once no other request holds it
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }
}

/// The request orchestrator. Owns the composed components; construction
/// verifies codec capabilities and prepares the cache directory.
pub struct ImageService<C: ImageCodec> {
    config: ServiceConfig,
    codec: C,
    store: VariantStore,
    gate: SweepGate,
    guard: RenderGuard,
}

impl<C: ImageCodec> ImageService<C> {
    pub fn new(config: ServiceConfig, codec: C) -> Result<Self, ServeError> {
        codec.verify()?;
        let store = VariantStore::new(&config.cache_dir);
        store.ensure_cache_dir()?;
        let gate = SweepGate::new(store.clone());
        Ok(Self {
            config,
            codec,
            store,
            gate,
            guard: RenderGuard::default(),
        })
    }

    pub fn store(&self) -> &VariantStore {
        &self.store
    }

    /// Unconditionally purge the cache.
    pub fn force_clear(&self) -> Result<usize, ServeError> {
        Ok(self.gate.force_clear()?)
    }

    /// Handle one request end to end.
    pub fn handle(
        &self,
        request: &ImageRequest,
        origin: RequestOrigin<'_>,
    ) -> Result<Outcome, ServeError> {
        if request.clear {
            let deleted = self.force_clear()?;
            return Ok(Outcome::Cleared { deleted });
        }

        // Validate
        let source_path = resolve_source(&request.src, origin, Path::new(&self.config.source_root))?;
        let bytes = std::fs::read(&source_path).map_err(|e| {
            ServeError::InvalidInput(format!("cannot read source image: {e}"))
        })?;
        let source_format = self.codec.identify(&bytes).map_err(|e| match e {
            CodecError::UnsupportedFormat(msg) => ServeError::InvalidImage(msg),
            other => ServeError::Codec(other),
        })?;

        // Clamp: oversized requests are capped, never rejected
        let width = request
            .width
            .unwrap_or(self.config.width)
            .clamp(self.config.min_width, self.config.max_width);
        let height = request
            .height
            .map(|h| h.clamp(self.config.min_height, self.config.max_height));

        // KeyDerive
        let digest = key::hash_bytes(&bytes);
        let variant_key = key::derive_key(&source_path, width, height, &digest);
        let output = self.config.resolved_output_format();

        // Lookup
        if let Some(path) = self.store.lookup(&variant_key, output) {
            match std::fs::read(&path) {
                Ok(cached) => {
                    debug!(key = %variant_key, "cache hit");
                    return Ok(Outcome::Image(ServedImage {
                        bytes: cached,
                        content_type: output.mime(),
                    }));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // A sweep or reaper beat us to the file: fall through to miss
                    debug!(key = %variant_key, "variant vanished after lookup, regenerating");
                }
                Err(e) => {
                    return Err(ServeError::ServeFailed(format!(
                        "cached variant unreadable: {e}"
                    )));
                }
            }
        }

        // Miss: serialize per key within this process
        let lock = self.guard.acquire(&variant_key);
        let result = {
            let _held = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.render_miss(&bytes, source_format, width, height, &variant_key, output)
        };
        self.guard.release(&variant_key, lock);
        result.map(Outcome::Image)
    }

    fn render_miss(
        &self,
        bytes: &[u8],
        source_format: crate::imaging::SourceFormat,
        width: u32,
        height: Option<u32>,
        variant_key: &str,
        output: OutputFormat,
    ) -> Result<ServedImage, ServeError> {
        // A concurrent request may have finished the render while we waited
        if let Some(path) = self.store.lookup(variant_key, output)
            && let Ok(cached) = std::fs::read(&path)
        {
            debug!(key = %variant_key, "variant appeared while waiting on render guard");
            return Ok(ServedImage {
                bytes: cached,
                content_type: output.mime(),
            });
        }

        debug!(key = %variant_key, "cache miss");

        // Reap stale siblings, then give the sweep gate its opportunistic run
        let reaped = reaper::reap(&self.store, variant_key);
        if reaped > 0 {
            info!(reaped, key = %variant_key, "evicted stale variants");
            if let Err(e) = self
                .gate
                .maybe_sweep(self.config.auto_clean, self.config.auto_clean_days)
            {
                warn!(error = %e, "sweep check failed");
            }
        }

        // Render and persist
        let rendered = self.codec.render(&RenderJob {
            bytes,
            source_format,
            target_width: width,
            target_height: height,
            output,
            quality: Quality::new(self.config.quality),
            compression: Compression::new(self.config.compression),
        })?;
        let path = self.store.persist(variant_key, output, &rendered)?;

        // Serve from the persisted file, not the in-memory buffer
        match std::fs::read(&path) {
            Ok(served) => Ok(ServedImage {
                bytes: served,
                content_type: output.mime(),
            }),
            Err(e) => {
                self.store.delete(&path);
                Err(ServeError::ServeFailed(format!(
                    "variant unreadable after persist: {e}"
                )))
            }
        }
    }
}

/// Resolve the `src` parameter to a file under the source root.
///
/// Absolute URLs are allowed only when their host matches the serving host
/// (same-origin rule — remote sources are out of scope by design); only
/// their path component is kept. Parent-directory traversal is rejected.
fn resolve_source(
    src: &str,
    origin: RequestOrigin<'_>,
    source_root: &Path,
) -> Result<PathBuf, ServeError> {
    if src.is_empty() {
        return Err(ServeError::InvalidInput("missing src parameter".to_string()));
    }

    let path_part = match Url::parse(src) {
        Ok(parsed) => {
            let src_host = parsed
                .host_str()
                .ok_or_else(|| ServeError::InvalidInput("src URL has no host".to_string()))?;
            let same_origin = origin
                .host
                .is_some_and(|h| h.eq_ignore_ascii_case(src_host));
            if !same_origin {
                return Err(ServeError::InvalidInput(format!(
                    "cross-origin source not allowed: {src_host}"
                )));
            }
            parsed.path().to_string()
        }
        // Not an absolute URL: treat as a plain path
        Err(_) => src.to_string(),
    };

    let relative = Path::new(path_part.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ServeError::InvalidInput(
            "parent directory traversal not allowed".to_string(),
        ));
    }

    let resolved = source_root.join(relative);
    if !resolved.is_file() {
        return Err(ServeError::InvalidInput(format!(
            "source image not found: {}",
            relative.display()
        )));
    }
    Ok(resolved)
}
