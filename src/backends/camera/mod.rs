// SPDX-License-Identifier: GPL-3.0-only

//! Camera session providers
//!
//! The capture screen never talks to hardware directly. It is handed a
//! [`SessionProvider`] and only ever holds the opaque [`StreamHandle`]s the
//! provider gives it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureScreen     │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ SessionProvider     │  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌───────────┐
//!   │ V4L2 │  │ StillImage│  ← Concrete implementations
//!   └──────┘  └───────────┘
//! ```

pub mod file_source;
pub mod types;
pub mod v4l2;

pub use file_source::StillImageProvider;
pub use types::*;
pub use v4l2::V4l2Provider;

use crate::config::Config;
use crate::constants::CaptureQuality;
use crate::media::Image;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Camera session provider
///
/// Acquisition, frame capture and device switching are asynchronous; the
/// remaining operations answer immediately.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a stream, preferring a device facing the given way
    async fn acquire(&self, preferred: Facing) -> BackendResult<StreamHandle>;

    /// Stop a stream and free its device
    ///
    /// Releasing never fails from the caller's point of view; providers log
    /// teardown problems themselves.
    fn release(&self, handle: StreamHandle);

    /// Sample the current frame of a stream as an encoded image
    ///
    /// Returns `None` when the stream has not produced a frame yet or is
    /// unknown.
    async fn capture_frame(&self, stream: StreamId) -> Option<Image>;

    /// Move a stream to the next device
    ///
    /// Consumes the current handle; on failure the old stream is gone too.
    async fn switch_device(&self, handle: StreamHandle) -> BackendResult<StreamHandle>;

    /// Whether more than one device is available to switch between
    fn has_multiple_devices(&self) -> bool;

    /// Latest live frame of a stream, for the preview region
    fn preview_frame(&self, stream: StreamId) -> Option<CameraFrame>;

    /// Devices this provider can open
    fn devices(&self) -> Vec<CameraDevice>;
}

/// Settings shared by all providers
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub width: u32,
    pub height: u32,
    pub quality: CaptureQuality,
    pub preview_max_edge: u32,
    pub source_paths: Vec<PathBuf>,
}

impl ProviderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.capture_width,
            height: config.capture_height,
            quality: config.capture_quality,
            preview_max_edge: config.preview_max_edge,
            source_paths: config.source_paths.clone(),
        }
    }
}

/// Get a provider instance for a backend type
pub fn get_provider(
    backend: CameraBackendType,
    options: ProviderOptions,
) -> Arc<dyn SessionProvider> {
    match backend {
        CameraBackendType::V4l2 => Arc::new(V4l2Provider::new(options)),
        CameraBackendType::StillImages => Arc::new(StillImageProvider::new(options)),
    }
}

/// Encode a frame as a captured still off the async executor
///
/// Shared by every provider's `capture_frame`; failures are logged and
/// reported as "no frame".
pub(crate) async fn encode_still(frame: CameraFrame, options: &ProviderOptions) -> Option<Image> {
    let quality = options.quality;
    let preview_edge = options.preview_max_edge;

    match tokio::task::spawn_blocking(move || Image::encode_frame(&frame, quality, preview_edge))
        .await
    {
        Ok(Ok(image)) => Some(image),
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to encode frame");
            None
        }
        Err(e) => {
            warn!(error = %e, "Encode task failed");
            None
        }
    }
}
