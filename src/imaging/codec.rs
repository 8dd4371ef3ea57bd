//! Image codec trait and shared error type.
//!
//! The [`ImageCodec`] trait defines the two operations the orchestrator
//! needs: sniff the format of raw bytes, and render a variant from them.
//! The production implementation is [`RustCodec`](super::rust_codec::RustCodec)
//! — pure Rust via the `image` crate, statically linked. Tests use a mock
//! that records jobs without touching pixels.

use super::params::{RenderJob, SourceFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    /// Input MIME or output format is not one of the supported three.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// A required codec is not compiled in. Fatal: the service refuses to start.
    #[error("missing codec capability: {0}")]
    MissingCapability(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Trait for image codecs.
///
/// `Sync` so one codec instance can serve concurrent requests.
pub trait ImageCodec: Sync {
    /// Check that the codecs this implementation needs are actually
    /// available. Called once at service construction; a failure is fatal.
    fn verify(&self) -> Result<(), CodecError> {
        Ok(())
    }

    /// Detect the source format by content sniffing.
    ///
    /// Returns `UnsupportedFormat` for anything other than JPEG/PNG/WebP.
    fn identify(&self, bytes: &[u8]) -> Result<SourceFormat, CodecError>;

    /// Crop, resample and encode one variant. Pure: no filesystem side effects.
    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, CodecError>;
}
