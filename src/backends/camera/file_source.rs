// SPDX-License-Identifier: GPL-3.0-only

//! Still image camera provider
//!
//! Serves image files as virtual camera devices, one device per file. The
//! "live" stream of a device is its image. Useful for demos, field testing on
//! machines without a camera, and reproducing a scan from a saved photo.

use super::types::{
    BackendError, BackendResult, CameraDevice, CameraFrame, Facing, PixelFormat, StreamHandle,
    StreamId, select_device,
};
use super::{ProviderOptions, SessionProvider, encode_still};
use crate::constants::file_formats;
use crate::media::Image;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Load an image file as an RGBA camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let path_str = path.display().to_string();
    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => BackendError::from_io(&path_str, &io),
        other => BackendError::FormatNotSupported(format!("{}: {}", path_str, other)),
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(path = %path_str, width, height, "Loaded image as frame");

    Ok(CameraFrame::packed(
        width,
        height,
        PixelFormat::RGBA,
        rgba.into_raw(),
    ))
}

/// Active virtual stream
struct StillSession {
    device_index: usize,
    frame: CameraFrame,
}

/// Provider backed by image files
pub struct StillImageProvider {
    options: ProviderOptions,
    devices: Vec<CameraDevice>,
    sessions: Mutex<HashMap<StreamId, StillSession>>,
    next_id: AtomicU64,
}

impl StillImageProvider {
    pub fn new(options: ProviderOptions) -> Self {
        let devices: Vec<CameraDevice> = options
            .source_paths
            .iter()
            .filter(|path| {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default();
                let supported = file_formats::is_image_extension(ext);
                if !supported {
                    warn!(path = %path.display(), "Skipping unsupported source file");
                }
                supported
            })
            .map(|path| {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                let facing = Facing::from_location(&name);
                CameraDevice::new(name, path.display().to_string(), facing)
            })
            .collect();

        info!(count = devices.len(), "Still image provider ready");

        Self {
            options,
            devices,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    async fn open(&self, device_index: usize) -> BackendResult<StreamHandle> {
        let device = self
            .devices
            .get(device_index)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound(format!("index {}", device_index)))?;

        let path = device.path.clone();
        let frame = tokio::task::spawn_blocking(move || load_image_as_frame(Path::new(&path)))
            .await
            .map_err(|e| BackendError::Other(format!("load task failed: {}", e)))??;

        let id = StreamId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sessions
            .lock()
            .map_err(|_| BackendError::Other("session table poisoned".into()))?
            .insert(
                id,
                StillSession {
                    device_index,
                    frame,
                },
            );

        info!(%id, device = %device.name, "Still image stream opened");
        Ok(StreamHandle::new(id, device))
    }

    fn take_session(&self, id: StreamId) -> Option<StillSession> {
        self.sessions.lock().ok()?.remove(&id)
    }
}

#[async_trait]
impl SessionProvider for StillImageProvider {
    async fn acquire(&self, preferred: Facing) -> BackendResult<StreamHandle> {
        let index = select_device(&self.devices, preferred)
            .ok_or_else(|| BackendError::DeviceNotFound("no image sources configured".into()))?;
        self.open(index).await
    }

    fn release(&self, handle: StreamHandle) {
        match self.take_session(handle.id()) {
            Some(_) => debug!(id = %handle.id(), "Still image stream released"),
            None => warn!(id = %handle.id(), "Release of unknown still image stream"),
        }
    }

    async fn capture_frame(&self, stream: StreamId) -> Option<Image> {
        let frame = self.preview_frame(stream)?;
        encode_still(frame, &self.options).await
    }

    async fn switch_device(&self, handle: StreamHandle) -> BackendResult<StreamHandle> {
        let session = self
            .take_session(handle.id())
            .ok_or(BackendError::UnknownStream(handle.id()))?;
        let next = (session.device_index + 1) % self.devices.len().max(1);
        info!(from = session.device_index, to = next, "Switching still image source");
        self.open(next).await
    }

    fn has_multiple_devices(&self) -> bool {
        self.devices.len() > 1
    }

    fn preview_frame(&self, stream: StreamId) -> Option<CameraFrame> {
        let sessions = self.sessions.lock().ok()?;
        sessions.get(&stream).map(|s| s.frame.clone())
    }

    fn devices(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }
}
