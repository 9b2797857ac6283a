// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera session providers

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 devices (/dev/video*)
    #[default]
    V4l2,
    /// Image files served as virtual camera devices
    StillImages,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::StillImages => write!(f, "still images"),
        }
    }
}

/// Which way a camera points relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing the user (selfie camera)
    Front,
    /// Facing away from the user ("environment"), preferred for leaf scans
    #[default]
    Rear,
    /// Unknown placement, typically a USB webcam
    External,
}

impl Facing {
    /// Guess the facing of a device from its name or location property
    ///
    /// Devices rarely report placement; names such as "Integrated Camera" or
    /// "Rear Camera" are the only hint V4L2 gives us.
    pub fn from_location(location: &str) -> Self {
        let lower = location.to_lowercase();
        if ["back", "rear", "environment", "world"]
            .iter()
            .any(|hint| lower.contains(hint))
        {
            Facing::Rear
        } else if ["front", "user", "integrated", "selfie", "facetime"]
            .iter()
            .any(|hint| lower.contains(hint))
        {
            Facing::Front
        } else {
            Facing::External
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Rear => write!(f, "rear"),
            Facing::External => write!(f, "external"),
        }
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "front" | "user" => Ok(Facing::Front),
            "rear" | "back" | "environment" => Ok(Facing::Rear),
            "external" => Ok(Facing::External),
            other => Err(format!("unknown facing '{}'", other)),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String, // Device node or source file path
    pub facing: Facing,
}

impl CameraDevice {
    pub fn new(name: impl Into<String>, path: impl Into<String>, facing: Facing) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            facing,
        }
    }
}

/// Pick the device to open for a facing preference
///
/// Falls back to the first device when nothing matches the preference.
pub fn select_device(devices: &[CameraDevice], preferred: Facing) -> Option<usize> {
    if devices.is_empty() {
        return None;
    }
    Some(
        devices
            .iter()
            .position(|d| d.facing == preferred)
            .unwrap_or(0),
    )
}

/// Identifier of an active stream, cheap to copy into async tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Opaque reference to an active camera session
///
/// Deliberately not `Clone`: releasing or switching consumes the handle, so a
/// stream can only be given back to its provider once.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamHandle {
    id: StreamId,
    device: CameraDevice,
}

impl StreamHandle {
    /// Create a handle; only providers should mint these
    pub fn new(id: StreamId, device: CameraDevice) -> Self {
        Self { id, device }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel of the packed format
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::RGB24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A single frame sampled from a live stream
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when the frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a frame from a tightly packed buffer
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format,
            stride: width * format.bytes_per_pixel(),
            captured_at: Instant::now(),
        }
    }

    /// Sample a pixel as RGB, clamping coordinates to the frame
    pub fn sample_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let bpp = self.format.bytes_per_pixel();
        let idx = (y * self.stride + x * bpp) as usize;
        let data = &self.data;

        match self.format {
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                if idx + 2 < data.len() {
                    (data[idx], data[idx + 1], data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::Gray8 => match data.get(idx) {
                Some(&v) => (v, v, v),
                None => (0, 0, 0),
            },
        }
    }

    /// Repack the frame as a tightly packed RGB image
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let (r, g, b) = self.sample_rgb(x, y);
                rgb.extend_from_slice(&[r, g, b]);
            }
        }
        image::RgbImage::from_raw(self.width, self.height, rgb)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
///
/// Every variant returned from `acquire` or `switch_device` is an acquisition
/// error and surfaces as the capture screen's `Error` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Access to the device was denied
    PermissionDenied(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Camera is busy or in use
    Busy(String),
    /// Format not supported
    FormatNotSupported(String),
    /// No frame arrived in time
    Timeout(String),
    /// The stream handle is not known to the provider
    UnknownStream(StreamId),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl BackendError {
    /// Map an I/O error from opening a device node to a backend error
    pub fn from_io(path: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                BackendError::PermissionDenied(format!("{}: {}", path, err))
            }
            std::io::ErrorKind::NotFound => {
                BackendError::DeviceNotFound(format!("{}: {}", path, err))
            }
            // EBUSY
            _ if err.raw_os_error() == Some(16) => BackendError::Busy(format!("{}: {}", path, err)),
            _ => BackendError::IoError(format!("{}: {}", path, err)),
        }
    }

    /// The provider's own message, without the category prefix of `Display`
    pub fn message(&self) -> String {
        match self {
            BackendError::NotAvailable(msg)
            | BackendError::PermissionDenied(msg)
            | BackendError::DeviceNotFound(msg)
            | BackendError::Busy(msg)
            | BackendError::FormatNotSupported(msg)
            | BackendError::Timeout(msg)
            | BackendError::IoError(msg)
            | BackendError::Other(msg) => msg.clone(),
            BackendError::UnknownStream(id) => format!("unknown stream {}", id),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Camera not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Camera not found: {}", msg),
            BackendError::Busy(msg) => write!(f, "Camera is busy: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Timeout(msg) => write!(f, "Camera timed out: {}", msg),
            BackendError::UnknownStream(id) => write!(f, "Unknown stream: {}", id),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
