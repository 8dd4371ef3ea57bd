//! # Vignette
//!
//! An on-demand image resize cache. Given a source image and requested
//! dimensions, vignette renders a fill-cropped variant once, persists it in
//! a cache directory, and serves every subsequent identical request from
//! disk. The filesystem is the only coordination mechanism — no database,
//! no lock manager.
//!
//! # Architecture: One Request, One Pass
//!
//! ```text
//! Validate → KeyDerive → Lookup ─ hit ──────────────→ Serve
//!                           └──── miss → Reap → Render → Persist → Serve
//! ```
//!
//! Cache correctness rests on three mechanisms, layered from fine to coarse:
//!
//! - **Content-bound keys**: a variant key embeds the SHA-256 of the source
//!   bytes, so editing a source image automatically routes requests to a new
//!   cache entry ([`key`]).
//! - **Stale-sibling reaping**: on each miss, old variants of the same source
//!   and dimensions (now-dead digests) are deleted ([`reaper`]).
//! - **Time-gated sweep**: every N days the whole cache directory is purged,
//!   reclaiming variants of sources that no longer exist ([`sweep`]).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Pure-Rust transform engine: sniff, fill-crop, resample, encode |
//! | [`key`] | Variant key derivation and parsing (`{base}-{w}[x{h}]-{digest}`) |
//! | [`store`] | Cache directory handle: lookup, persist, delete, guard file |
//! | [`reaper`] | Stale variant eviction on the miss path |
//! | [`sweep`] | Time-gated full purge + unconditional force-clear |
//! | [`serve`] | Request orchestrator: validation, clamping, cache headers |
//! | [`config`] | Immutable TOML-loaded service configuration |
//!
//! # Design Decisions
//!
//! ## Fill, Not Fit
//!
//! Variants always exactly fill the requested box: the source is center
//! cropped to the target aspect ratio before scaling. Excess content is
//! discarded rather than letterboxed. Layouts can rely on every variant
//! having precisely the dimensions they asked for.
//!
//! ## The Filesystem Is the Cache Index
//!
//! There is no manifest. A variant exists iff its file exists, and the whole
//! invalidation story is encoded in the filename. This makes concurrent
//! requests trivially safe at the cost of tolerating benign races: two
//! processes may render the same variant (identical bytes, last writer
//! wins), and a sweep may delete a file mid-serve (treated as a miss and
//! regenerated, never an error).
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate — Lanczos3 resampling,
//! pure-Rust JPEG/PNG/WebP codecs. No ImageMagick, no system dependencies;
//! the binary is fully self-contained. The WebP encoder is lossless-only,
//! so `quality` applies to JPEG output and `compression` to PNG.

pub mod config;
pub mod imaging;
pub mod key;
pub mod reaper;
pub mod serve;
pub mod store;
pub mod sweep;
