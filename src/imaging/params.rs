//! Parameter types for image rendering.
//!
//! These types describe *what* to render, not *how*. They are the interface
//! between the request orchestrator (which decides what variant is needed)
//! and the [`codec`](super::codec) (which does the actual pixel work). The
//! separation allows swapping codecs (e.g. for testing with a mock) without
//! changing orchestration logic.

use image::ImageFormat;

/// Quality setting for lossy image encoding (0-100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// PNG compression level (0-9, 9 = smallest output). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression(pub u8);

impl Compression {
    pub fn new(value: u8) -> Self {
        Self(value.min(9))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self(8)
    }
}

/// Input image format, detected by content sniffing (never by extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    /// Canonical MIME type of this source format.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Map an allowed MIME string to a source format.
    ///
    /// `image/jpg` is accepted as a widely-used alias for `image/jpeg`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

/// Output encoding for rendered variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Jpg,
    Png,
    #[default]
    WebP,
}

impl OutputFormat {
    /// Parse a configured format name. Returns `None` for unknown names;
    /// the fallback-to-jpg policy lives in the config layer, not here.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// File extension used for variant files.
    pub fn ext(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    /// MIME type served for this output format.
    ///
    /// Responses advertise the *output* format's MIME, not the source's.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Whether this format keeps an alpha channel through encoding.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpg)
    }

    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

/// Full specification of one render: source bytes plus target box and encoding.
#[derive(Debug, Clone)]
pub struct RenderJob<'a> {
    pub bytes: &'a [u8],
    pub source_format: SourceFormat,
    pub target_width: u32,
    /// `None` means "derive from the source aspect ratio".
    pub target_height: Option<u32>,
    pub output: OutputFormat,
    pub quality: Quality,
    pub compression: Compression,
}
