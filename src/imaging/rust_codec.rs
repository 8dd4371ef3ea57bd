//! Pure Rust codec built on the `image` crate — zero external dependencies.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` |
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Crop | `DynamicImage::crop_imm` window from [`fill_crop_window`] |
//! | Resample | `image::imageops` `Lanczos3` via `resize_exact` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder::new_with_quality` (level mapped to zlib preset) |
//! | Encode → WebP | `WebPEncoder::new_lossless` |
//!
//! The `image` crate's WebP encoder is lossless-only, so the quality
//! parameter is accepted and ignored for WebP output.

use super::calculations::{derive_height, fill_crop_window};
use super::codec::{CodecError, ImageCodec};
use super::params::{Compression, OutputFormat, Quality, RenderJob, SourceFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Formats every deployment must be able to both decode and encode.
const REQUIRED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png];

/// Pure Rust codec using the `image` crate.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }

    /// Verify that the required codecs are compiled in.
    ///
    /// JPEG and PNG must support both reading and writing; without them the
    /// service cannot serve at all. WebP is optional — the config layer falls
    /// back to JPEG output when [`webp_encoding_enabled`] reports false.
    pub fn verify_capabilities() -> Result<(), CodecError> {
        for fmt in REQUIRED_FORMATS {
            if !fmt.reading_enabled() || !fmt.writing_enabled() {
                return Err(CodecError::MissingCapability(format!(
                    "{} codec not compiled in",
                    fmt.extensions_str()[0]
                )));
            }
        }
        Ok(())
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a WebP encoder is compiled into this binary.
pub fn webp_encoding_enabled() -> bool {
    ImageFormat::WebP.writing_enabled()
}

fn decode(bytes: &[u8], format: SourceFormat) -> Result<DynamicImage, CodecError> {
    image::load_from_memory_with_format(bytes, format.image_format())
        .map_err(|e| CodecError::Decode(e.to_string()))
}

/// Map a 0-9 compression level onto the `image` crate's zlib presets.
fn png_compression(level: Compression) -> CompressionType {
    match level.value() {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode(
    img: &DynamicImage,
    output: OutputFormat,
    quality: Quality,
    compression: Compression,
) -> Result<Vec<u8>, CodecError> {
    if !output.image_format().writing_enabled() {
        return Err(CodecError::MissingCapability(format!(
            "{} encoder not compiled in",
            output.ext()
        )));
    }

    let keep_alpha = output.supports_alpha() && img.color().has_alpha();
    let mut buf = Cursor::new(Vec::new());

    match output {
        OutputFormat::Jpg => {
            // JPEG has no alpha channel; flatten to RGB
            let rgb = img.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value());
            rgb.write_with_encoder(encoder)
                .map_err(|e| CodecError::Encode(e.to_string()))?;
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, png_compression(compression), PngFilter::Adaptive);
            if keep_alpha {
                img.to_rgba8()
                    .write_with_encoder(encoder)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            } else {
                img.to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            }
        }
        OutputFormat::WebP => {
            let encoder = WebPEncoder::new_lossless(&mut buf);
            if keep_alpha {
                img.to_rgba8()
                    .write_with_encoder(encoder)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            } else {
                img.to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            }
        }
    }

    Ok(buf.into_inner())
}

impl ImageCodec for RustCodec {
    fn verify(&self) -> Result<(), CodecError> {
        Self::verify_capabilities()
    }

    fn identify(&self, bytes: &[u8]) -> Result<SourceFormat, CodecError> {
        let format = image::guess_format(bytes)
            .map_err(|e| CodecError::UnsupportedFormat(e.to_string()))?;
        match format {
            ImageFormat::Jpeg => Ok(SourceFormat::Jpeg),
            ImageFormat::Png => Ok(SourceFormat::Png),
            ImageFormat::WebP => Ok(SourceFormat::WebP),
            other => Err(CodecError::UnsupportedFormat(format!(
                "{} input is not supported",
                other.extensions_str().first().copied().unwrap_or("unknown")
            ))),
        }
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<Vec<u8>, CodecError> {
        let img = decode(job.bytes, job.source_format)?;
        let source_dims = (img.width(), img.height());

        let target_w = job.target_width;
        let target_h = job
            .target_height
            .unwrap_or_else(|| derive_height(source_dims, target_w));

        // Crop to the target aspect ratio first, then scale the window onto
        // a canvas of exactly target_w x target_h
        let window = fill_crop_window(source_dims, (target_w, target_h));
        let cropped = img.crop_imm(window.x, window.y, window.width, window.height);
        let resized = cropped.resize_exact(target_w, target_h, FilterType::Lanczos3);

        encode(&resized, job.output, job.quality, job.compression)
    }
}
