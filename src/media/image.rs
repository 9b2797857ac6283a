// SPDX-License-Identifier: GPL-3.0-only

//! Encoded still images
//!
//! An [`Image`] is the single representation shared by captured frames and
//! uploaded files: the encoded bytes as they will be handed off, plus a small
//! RGBA preview for rendering. Images are immutable once built and cheap to
//! clone.

use crate::backends::camera::types::CameraFrame;
use crate::constants::CaptureQuality;
use crate::errors::DecodeError;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Where an image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Sampled from a live camera stream
    Camera,
    /// Decoded from a user-selected file
    Upload,
    /// Read back from the handoff slot
    Handoff,
}

/// Encodings accepted for handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Jpeg,
    Png,
    Gif,
    Bmp,
    WebP,
}

impl ImageEncoding {
    /// MIME type used in data URLs
    pub fn mime(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
            ImageEncoding::Gif => "image/gif",
            ImageEncoding::Bmp => "image/bmp",
            ImageEncoding::WebP => "image/webp",
        }
    }

    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageEncoding::Jpeg),
            ImageFormat::Png => Some(ImageEncoding::Png),
            ImageFormat::Gif => Some(ImageEncoding::Gif),
            ImageFormat::Bmp => Some(ImageEncoding::Bmp),
            ImageFormat::WebP => Some(ImageEncoding::WebP),
            _ => None,
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ImageEncoding::Jpeg => ImageFormat::Jpeg,
            ImageEncoding::Png => ImageFormat::Png,
            ImageEncoding::Gif => ImageFormat::Gif,
            ImageEncoding::Bmp => ImageFormat::Bmp,
            ImageEncoding::WebP => ImageFormat::WebP,
        }
    }
}

/// An encoded raster payload
#[derive(Clone)]
pub struct Image {
    bytes: Arc<[u8]>,
    encoding: ImageEncoding,
    width: u32,
    height: u32,
    source: ImageSource,
    captured_at: DateTime<Local>,
    preview: Arc<RgbaImage>,
}

impl Image {
    /// Decode encoded bytes, keeping them untouched as the payload
    pub fn decode(
        bytes: Vec<u8>,
        source: ImageSource,
        preview_max_edge: u32,
    ) -> Result<Self, DecodeError> {
        let format = image::guess_format(&bytes)
            .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;
        let encoding = ImageEncoding::from_image_format(format)
            .ok_or_else(|| DecodeError::UnsupportedFormat(format!("{:?}", format)))?;

        let decoded = image::load_from_memory_with_format(&bytes, encoding.image_format())
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        let preview = decoded
            .thumbnail(preview_max_edge, preview_max_edge)
            .to_rgba8();

        debug!(width, height, ?encoding, ?source, "Decoded image");

        Ok(Self {
            bytes: Arc::from(bytes.into_boxed_slice()),
            encoding,
            width,
            height,
            source,
            captured_at: Local::now(),
            preview: Arc::new(preview),
        })
    }

    /// Encode a camera frame as JPEG
    pub fn encode_frame(
        frame: &CameraFrame,
        quality: CaptureQuality,
        preview_max_edge: u32,
    ) -> Result<Self, String> {
        let rgb = frame
            .to_rgb_image()
            .ok_or_else(|| "Frame buffer does not match its dimensions".to_string())?;

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());
        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| format!("JPEG encoding failed: {}", e))?;

        let preview = image::DynamicImage::ImageRgb8(rgb)
            .thumbnail(preview_max_edge, preview_max_edge)
            .to_rgba8();

        debug!(
            width = frame.width,
            height = frame.height,
            size = buffer.len(),
            "Encoded frame"
        );

        Ok(Self {
            bytes: Arc::from(buffer.into_boxed_slice()),
            encoding: ImageEncoding::Jpeg,
            width: frame.width,
            height: frame.height,
            source: ImageSource::Camera,
            captured_at: Local::now(),
            preview: Arc::new(preview),
        })
    }

    /// Read and decode an image file off the async executor
    pub async fn load_file(path: &Path, preview_max_edge: u32) -> Result<Self, DecodeError> {
        let bytes = tokio::fs::read(path).await?;
        tokio::task::spawn_blocking(move || {
            Self::decode(bytes, ImageSource::Upload, preview_max_edge)
        })
        .await
        .map_err(|e| DecodeError::Io(format!("decode task failed: {}", e)))?
    }

    /// Serialize as a `data:<mime>;base64,<payload>` URL
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.encoding.mime(),
            STANDARD.encode(&self.bytes)
        )
    }

    /// Parse a data URL written by [`Image::to_data_url`]
    pub fn from_data_url(
        url: &str,
        source: ImageSource,
        preview_max_edge: u32,
    ) -> Result<Self, DecodeError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| DecodeError::InvalidDataUrl("missing data: prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| DecodeError::InvalidDataUrl("missing payload separator".into()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| DecodeError::InvalidDataUrl("payload is not base64".into()))?;
        if !mime.starts_with("image/") {
            return Err(DecodeError::InvalidDataUrl(format!(
                "not an image type: {}",
                mime
            )));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| DecodeError::InvalidDataUrl(e.to_string()))?;
        Self::decode(bytes, source, preview_max_edge)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    /// Downscaled RGBA pixels for display
    pub fn preview(&self) -> &RgbaImage {
        &self.preview
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.encoding == other.encoding && self.bytes == other.bytes
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("encoding", &self.encoding)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("source", &self.source)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
