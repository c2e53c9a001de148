//! Image formats and encoded tile images.
//!
//! Tiles are passed through as the bytes the remote service sent; nothing in
//! this workspace decodes them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encoded image formats a tile service can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageFormat {
    /// Parse a mime type ("image/png") or a bare extension ("png", "jpg").
    ///
    /// Mime parameters such as `; mode=8bit` are ignored.
    pub fn parse(s: &str) -> Result<Self, FormatParseError> {
        let normalized = s.trim().to_lowercase();
        let base = normalized.split(';').next().unwrap_or_default().trim();
        let name = base.strip_prefix("image/").unwrap_or(base);

        match name {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::Webp),
            "gif" => Ok(ImageFormat::Gif),
            _ => Err(FormatParseError::UnsupportedFormat(s.to_string())),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// File extension used in tile URLs and file names.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
            ImageFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for ImageFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImageFormat {
    type Error = FormatParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ImageFormat> for String {
    fn from(format: ImageFormat) -> Self {
        format.mime_type().to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormatParseError {
    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),
}

/// Fallback image parameters of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Format requested when a query does not name one.
    #[serde(default)]
    pub format: ImageFormat,
    /// Whether tiles of this source carry transparency.
    ///
    /// Tiles are never decoded here; the flag is carried for callers that
    /// compose tiles from several sources.
    #[serde(default)]
    pub transparent: bool,
}

impl ImageOptions {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            transparent: false,
        }
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }
}

/// An encoded tile image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    pub data: Bytes,
    pub format: ImageFormat,
}

impl TileImage {
    pub fn new(data: impl Into<Bytes>, format: ImageFormat) -> Self {
        Self {
            data: data.into(),
            format,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
