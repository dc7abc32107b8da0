//! The request-scoped values that flow through one generation run.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose;
use image::ImageFormat;

use crate::constants::FALLBACK_MIME_TYPE;
use crate::error::BannerError;

/// The layout sketch as uploaded, plus the format sniffed from its bytes.
#[derive(Clone, Debug)]
pub struct UploadedSketch {
    bytes: Vec<u8>,
    format: Option<ImageFormat>,
}

impl UploadedSketch {
    /// Wraps uploaded bytes, returns `None` for an empty upload.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let format = image::guess_format(&bytes).ok();
        Some(Self { bytes, format })
    }

    /// Raw bytes as uploaded.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// PNG and JPEG are recognised, anything else is sent as JPEG.
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Png) => "image/png",
            Some(ImageFormat::Jpeg) => "image/jpeg",
            _ => FALLBACK_MIME_TYPE,
        }
    }

    /// Base64 of the raw bytes.
    pub fn base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URL suitable for multimodal chat requests.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.base64())
    }
}

/// Output sizes the form offers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ImageSize {
    /// 1024x1024
    #[default]
    Square,
    /// 1792x1024
    Landscape,
    /// 1024x1792
    Portrait,
}

impl ImageSize {
    /// Every supported size, in form order.
    pub const ALL: [ImageSize; 3] = [ImageSize::Square, ImageSize::Landscape, ImageSize::Portrait];

    /// Wire format, eg `1024x1024`.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }

    /// Closest aspect ratio label, as used by Imagen.
    pub fn aspect_ratio(self) -> &'static str {
        match self {
            ImageSize::Square => "1:1",
            ImageSize::Landscape => "16:9",
            ImageSize::Portrait => "9:16",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = BannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str() == s.trim())
            .ok_or_else(|| BannerError::BadRequest(format!("unsupported image size '{s}'")))
    }
}

/// What the user typed into the form.
#[derive(Clone, Debug, Default)]
pub struct UserInstructions {
    /// Overall mood/style, may be empty
    pub impression: String,
    /// Per-element instructions, must not be empty
    pub details: String,
    /// Requested output size
    pub size: ImageSize,
}

/// Image bytes coming back from a provider.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    /// Encoded image, whatever format the provider chose
    pub bytes: Vec<u8>,
    /// Where the provider hosted it, if it returned a URL
    pub source_url: Option<String>,
}

/// What gets shown to the user at the end of a run.
#[derive(Clone, Debug)]
pub struct FinalImage {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: &'static str,
    /// Whether text was drawn onto it locally
    pub overlaid: bool,
    /// Provider URL, if there was one
    pub source_url: Option<String>,
}

impl FinalImage {
    /// Uses the provider output as-is.
    pub fn from_generated(generated: GeneratedImage) -> Self {
        let mime_type = match image::guess_format(&generated.bytes) {
            Ok(ImageFormat::Jpeg) => "image/jpeg",
            Ok(ImageFormat::WebP) => "image/webp",
            _ => "image/png",
        };
        Self {
            bytes: generated.bytes,
            mime_type,
            overlaid: false,
            source_url: generated.source_url,
        }
    }

    /// Encodes an overlaid raster as PNG.
    pub fn from_overlay(
        image: &image::RgbImage,
        source_url: Option<String>,
    ) -> Result<Self, BannerError> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(Self {
            bytes: buf.into_inner(),
            mime_type: "image/png",
            overlaid: true,
            source_url,
        })
    }

    /// `data:` URL for inline display.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}
