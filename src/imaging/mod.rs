//! Image transform engine — pure Rust, zero external dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` |
//! | **Fill crop** | pure window math + `crop_imm` |
//! | **Resample** | Lanczos3 via `resize_exact` |
//! | **Encode** | JPEG / PNG / lossless WebP encoders |
//!
//! The module is split into:
//! - **Calculations**: pure functions for crop/aspect math (unit testable)
//! - **Parameters**: data structures describing a render job
//! - **Codec**: [`ImageCodec`] trait + [`RustCodec`]

mod calculations;
pub mod codec;
mod params;
pub mod rust_codec;

pub use calculations::{CropWindow, derive_height, fill_crop_window};
pub use codec::{CodecError, ImageCodec};
pub use params::{Compression, OutputFormat, Quality, RenderJob, SourceFormat};
pub use rust_codec::{RustCodec, webp_encoding_enabled};
