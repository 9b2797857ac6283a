// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session storage key holding the most recently confirmed image
pub const HANDOFF_KEY: &str = "capturedImage";

/// Route the screen navigates to after confirming a capture
pub const ANALYSIS_ROUTE: &str = "/analyzing";

/// Default capture resolution requested from camera devices
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

/// Longest edge of the RGBA preview kept alongside every encoded image
pub const DEFAULT_PREVIEW_MAX_EDGE: u32 = 320;

/// JPEG quality presets for captured frames
///
/// Uploaded files keep their original encoding; only camera frames are encoded
/// with this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression, default)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl CaptureQuality {
    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            CaptureQuality::Low => "Low",
            CaptureQuality::Medium => "Medium",
            CaptureQuality::High => "High",
            CaptureQuality::Maximum => "Maximum",
        }
    }

    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            CaptureQuality::Low => 60,
            CaptureQuality::Medium => 80,
            CaptureQuality::High => 92,
            CaptureQuality::Maximum => 98,
        }
    }
}

/// Camera timing constants
pub mod timing {
    use super::Duration;

    /// How long acquisition waits for the first frame before giving up
    pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// How long the capture thread waits for the first frame after STREAMON
    ///
    /// Shorter than `ACQUIRE_TIMEOUT` so the thread reports its own timeout.
    pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(4);

    /// Capture thread poll interval; bounds how long a stop request waits
    pub const FRAME_POLL_TIMEOUT: Duration = Duration::from_millis(200);

    /// Consecutive dequeue failures after which a stream is considered lost
    pub const MAX_CONSECUTIVE_FRAME_ERRORS: u32 = 10;

    /// Terminal input poll interval (~60fps redraw)
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Interval the headless snapshot waits between frame attempts
    pub const SNAP_RETRY_INTERVAL: Duration = Duration::from_millis(100);

    /// Number of frame attempts the headless snapshot makes
    pub const SNAP_MAX_ATTEMPTS: u32 = 50;
}

/// User-facing strings of the capture screen
pub mod ui {
    pub const TITLE: &str = "Scan Crop";
    pub const STARTING_CAMERA: &str = "Starting camera...";
    pub const CAPTION_POSITION: &str = "Position the leaf within the frame";
    pub const CAPTION_LIGHTING: &str = "Ensure good lighting for best results";
    pub const ERROR_HINT: &str = "Check camera permissions or reconnect the device, then retry";
}

pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
