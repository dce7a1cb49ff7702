//! Core types for image-to-image generation.

use crate::error::{RestyleError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Mime type assumed when a data URL or response does not name one.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Image formats recognised by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Maps a MIME type back to a known format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // GIF87a / GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Aspect ratios accepted by the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 landscape (widescreen) aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    /// Every supported ratio.
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::StandardPortrait,
        Self::Standard,
        Self::Portrait,
        Self::Landscape,
    ];

    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::StandardPortrait => "3:4",
            Self::Standard => "4:3",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = RestyleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| {
                RestyleError::InvalidRequest(format!(
                    "unsupported aspect ratio '{s}', expected one of 1:1, 3:4, 4:3, 9:16, 16:9"
                ))
            })
    }
}

/// Output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    /// Roughly 1024px on the long edge.
    #[default]
    #[serde(rename = "1K")]
    OneK,
    /// Roughly 2048px on the long edge.
    #[serde(rename = "2K")]
    TwoK,
    /// Roughly 4096px on the long edge.
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    /// Returns the tier as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = RestyleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            _ => Err(RestyleError::InvalidRequest(format!(
                "unsupported image size '{s}', expected 1K, 2K or 4K"
            ))),
        }
    }
}

/// Decodes base64 that may be imperfectly formatted.
///
/// Embedded whitespace is stripped and missing `=` padding is tolerated.
pub(crate) fn decode_base64_lenient(input: &str) -> Result<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(cleaned.trim_end_matches('='))
        .map_err(|e| RestyleError::Decode(e.to_string()))
}

/// An image held as mime type plus raw bytes.
///
/// Its transmission and display form is a data URL,
/// `data:<mime>;base64,<payload>`. Instances are replaced wholesale, never
/// edited in place.
#[derive(Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    mime_type: String,
    data: Vec<u8>,
}

/// The image a user selected as the starting point of a generation.
pub type SourceImage = EmbeddedImage;

impl EmbeddedImage {
    /// Creates an embedded image from a mime type and raw bytes.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Parses a data URL.
    ///
    /// The header and payload are split on the first `,`. The mime type is
    /// whatever sits between `:` and `;` in the header; when nothing can be
    /// matched there it falls back to `image/png` instead of failing.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (header, payload) = url
            .split_once(',')
            .ok_or_else(|| RestyleError::Decode("data URL has no ',' separator".into()))?;

        let mime_type = header
            .split_once(':')
            .and_then(|(_, rest)| rest.split_once(';'))
            .map(|(mime, _)| mime.trim())
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);

        Ok(Self::new(mime_type, decode_base64_lenient(payload)?))
    }

    /// Returns the mime type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the mime type is an `image/*` type.
    pub fn is_image(&self) -> bool {
        self.mime_type.to_lowercase().starts_with("image/")
    }

    /// File extension matching the mime type, `png` when unknown.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(&self.mime_type)
            .unwrap_or_default()
            .extension()
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Saves the raw image bytes to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

impl std::fmt::Debug for EmbeddedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedImage")
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A request to transform a source image.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The image to transform.
    pub image: SourceImage,
    /// The text prompt describing the transformation.
    pub prompt: String,
    /// Aspect ratio of the output.
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Creates a new request with the default 1:1 aspect ratio.
    pub fn new(image: SourceImage, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
        }
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// An image returned by a provider.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// The returned image, with the mime type the provider reported.
    pub image: EmbeddedImage,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(image: EmbeddedImage, metadata: GenerationMetadata) -> Self {
        Self { image, metadata }
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        self.image.to_data_url()
    }
}
