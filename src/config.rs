//! Service configuration.
//!
//! Loaded once at process start, validated, then passed by reference into
//! every component constructor — there is no ambient global lookup. Config
//! files are sparse TOML; override just the values you want:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_root = "."          # Directory source images are resolved under
//! cache_dir = "cache"        # Directory variant files are written to
//! quality = 90               # JPEG quality (0-100; WebP output is lossless)
//! compression = 8            # PNG compression level (0-9)
//! width = 640                # Default target width when the request has none
//! min_width = 16
//! min_height = 16
//! max_width = 2560           # Requests above this are capped, not rejected
//! max_height = 2560
//! auto_clean = true          # Enable the time-gated full-cache sweep
//! auto_clean_days = 30       # Sweep interval
//! output_format = "webp"     # jpg | png | webp
//! ```
//!
//! Unknown keys are rejected to catch typos early. An unrecognized
//! `output_format`, or `webp` on a build without a WebP encoder, falls back
//! to `jpg` with a warning rather than failing the process.

use crate::imaging::{OutputFormat, webp_encoding_enabled};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Immutable service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Directory source image paths are resolved under.
    pub source_root: String,
    /// Directory variant files are cached in.
    pub cache_dir: String,
    /// JPEG encoding quality (0-100). WebP output is lossless and ignores it.
    pub quality: u8,
    /// PNG compression level (0-9, 9 = smallest).
    pub compression: u8,
    /// Default target width when the request does not name one.
    pub width: u32,
    pub min_width: u32,
    pub min_height: u32,
    /// Requested widths above this are silently capped, never rejected.
    pub max_width: u32,
    pub max_height: u32,
    /// Enable the time-gated full-cache sweep.
    pub auto_clean: bool,
    /// Sweep interval in days.
    pub auto_clean_days: u32,
    /// Variant encoding: `jpg`, `png` or `webp`.
    pub output_format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            source_root: ".".to_string(),
            cache_dir: "cache".to_string(),
            quality: 90,
            compression: 8,
            width: 640,
            min_width: 16,
            min_height: 16,
            max_width: 2560,
            max_height: 2560,
            auto_clean: true,
            auto_clean_days: 30,
            output_format: "webp".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality > 100 {
            return Err(ConfigError::Validation(format!(
                "quality must be 0-100, got {}",
                self.quality
            )));
        }
        if self.compression > 9 {
            return Err(ConfigError::Validation(format!(
                "compression must be 0-9, got {}",
                self.compression
            )));
        }
        if self.min_width == 0 || self.min_height == 0 {
            return Err(ConfigError::Validation(
                "min_width and min_height must be at least 1".to_string(),
            ));
        }
        if self.min_width > self.max_width {
            return Err(ConfigError::Validation(format!(
                "min_width {} exceeds max_width {}",
                self.min_width, self.max_width
            )));
        }
        if self.min_height > self.max_height {
            return Err(ConfigError::Validation(format!(
                "min_height {} exceeds max_height {}",
                self.min_height, self.max_height
            )));
        }
        if self.width < self.min_width || self.width > self.max_width {
            return Err(ConfigError::Validation(format!(
                "default width {} outside [{}, {}]",
                self.width, self.min_width, self.max_width
            )));
        }
        if self.auto_clean && self.auto_clean_days == 0 {
            return Err(ConfigError::Validation(
                "auto_clean_days must be at least 1 when auto_clean is on".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the configured output format.
    ///
    /// Unknown names fall back to JPEG, as does WebP on builds without a
    /// WebP encoder. Fallback is logged, never fatal — serving a different
    /// format beats serving nothing.
    pub fn resolved_output_format(&self) -> OutputFormat {
        let format = match OutputFormat::from_name(&self.output_format) {
            Some(f) => f,
            None => {
                warn!(
                    configured = %self.output_format,
                    "unrecognized output_format, falling back to jpg"
                );
                return OutputFormat::Jpg;
            }
        };
        if format == OutputFormat::WebP && !webp_encoding_enabled() {
            warn!("webp encoder unavailable, falling back to jpg");
            return OutputFormat::Jpg;
        }
        format
    }
}
