// SPDX-License-Identifier: GPL-3.0-only

//! Video4Linux2 camera provider
//!
//! Each stream owns a capture thread that opens the device, negotiates YUYV
//! (falling back to MJPEG) and keeps the most recent frame, converted to
//! RGB24, in a shared slot. Capturing a photo encodes whatever frame is in
//! the slot at that moment.

use super::types::{
    BackendError, BackendResult, CameraDevice, CameraFrame, Facing, StreamHandle, StreamId,
    select_device,
};
use super::{ProviderOptions, SessionProvider, encode_still};
use crate::constants::timing;
use crate::media::Image;
use crate::media::conversions::{mjpeg_to_frame, yuyv_to_frame};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Enumerate V4L2 capture devices
///
/// Scans /dev/video* and keeps nodes that advertise at least one capture
/// format, which filters out the metadata nodes UVC cameras also expose.
pub fn enumerate_v4l2_cameras() -> Vec<CameraDevice> {
    let mut paths: Vec<_> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("video"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut devices = Vec::new();
    for path in paths {
        let path_str = path.to_string_lossy().to_string();
        let Ok(dev) = Device::with_path(&path) else {
            debug!(path = %path_str, "Cannot open video node");
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }
        let has_formats = dev
            .enum_formats()
            .map(|formats| !formats.is_empty())
            .unwrap_or(false);
        if !has_formats {
            continue;
        }

        let facing = Facing::from_location(&caps.card);
        debug!(path = %path_str, card = %caps.card, %facing, "Found V4L2 camera");
        devices.push(CameraDevice::new(caps.card, path_str, facing));
    }

    devices
}

/// Active capture thread for one device
struct V4l2Session {
    device_index: usize,
    stop_signal: Arc<AtomicBool>,
    latest_frame: Arc<Mutex<Option<CameraFrame>>>,
    capture_thread: Option<JoinHandle<()>>,
}

impl V4l2Session {
    fn start(
        device_index: usize,
        device: &CameraDevice,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let latest_frame = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel();

        let path = device.path.clone();
        let thread_stop = Arc::clone(&stop_signal);
        let thread_latest = Arc::clone(&latest_frame);
        let capture_thread = std::thread::Builder::new()
            .name("leafscan-v4l2".into())
            .spawn(move || {
                capture_loop(&path, width, height, thread_stop, thread_latest, ready_tx)
            })
            .map_err(|e| BackendError::Other(format!("Failed to spawn capture thread: {}", e)))?;

        let mut session = Self {
            device_index,
            stop_signal,
            latest_frame,
            capture_thread: Some(capture_thread),
        };

        match ready_rx.recv_timeout(timing::ACQUIRE_TIMEOUT) {
            Ok(Ok(())) => Ok(session),
            Ok(Err(e)) => {
                session.stop();
                Err(e)
            }
            Err(_) => {
                session.stop();
                Err(BackendError::Timeout(format!(
                    "{} did not start streaming",
                    device.path
                )))
            }
        }
    }

    fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take()
            && handle.join().is_err()
        {
            warn!("V4L2 capture thread panicked");
        }
    }

    fn latest(&self) -> Option<CameraFrame> {
        self.latest_frame.lock().ok()?.clone()
    }
}

impl Drop for V4l2Session {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture loop running in a separate thread
fn capture_loop(
    path: &str,
    width: u32,
    height: u32,
    stop_signal: Arc<AtomicBool>,
    latest_frame: Arc<Mutex<Option<CameraFrame>>>,
    ready: mpsc::Sender<BackendResult<()>>,
) {
    let dev = match Device::with_path(path) {
        Ok(dev) => dev,
        Err(e) => {
            let _ = ready.send(Err(BackendError::from_io(path, &e)));
            return;
        }
    };

    let yuyv = FourCC::new(b"YUYV");
    let mjpg = FourCC::new(b"MJPG");

    let format = match negotiate_format(&dev, width, height, &[yuyv, mjpg]) {
        Ok(format) => format,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    info!(
        path,
        width = format.width,
        height = format.height,
        fourcc = %format.fourcc,
        "V4L2 format configured"
    );

    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, 4) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(BackendError::from_io(path, &e)));
            return;
        }
    };
    let handle = stream.handle();
    let publish = |data: &[u8]| {
        let frame = if format.fourcc == yuyv {
            yuyv_to_frame(data, format.width, format.height, format.stride)
        } else {
            mjpeg_to_frame(data)
        };
        match frame {
            Some(frame) => {
                if let Ok(mut guard) = latest_frame.lock() {
                    *guard = Some(frame);
                }
            }
            None => debug!("Dropping undecodable frame"),
        }
    };

    // The first dequeue starts streaming; bound it so a silent device fails acquisition
    stream.set_timeout(timing::FIRST_FRAME_TIMEOUT);
    match stream.next() {
        Ok((buf, meta)) => publish(used_bytes(buf, meta.bytesused)),
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            let _ = ready.send(Err(BackendError::Timeout(format!(
                "{} produced no frame",
                path
            ))));
            return;
        }
        Err(e) => {
            let _ = ready.send(Err(BackendError::from_io(path, &e)));
            return;
        }
    }
    let _ = ready.send(Ok(()));

    // Wait in poll() rather than DQBUF so the stop signal is seen promptly
    let poll_ms = timing::FRAME_POLL_TIMEOUT.as_millis() as i32;
    let mut errors = ErrorBudget::new(timing::MAX_CONSECUTIVE_FRAME_ERRORS);
    while !stop_signal.load(Ordering::SeqCst) {
        match handle.poll(libc::POLLIN, poll_ms) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Polling video device failed");
                if errors.failure() {
                    break;
                }
                continue;
            }
        }

        match stream.next() {
            Ok((buf, meta)) => {
                errors.success();
                publish(used_bytes(buf, meta.bytesused));
            }
            Err(e) => {
                warn!(error = %e, "Failed to capture frame");
                if errors.failure() {
                    break;
                }
            }
        }
    }

    if errors.exhausted() {
        warn!(path, "Video device stopped delivering frames");
    }
    // Never serve a frame from a stream that is no longer running
    if let Ok(mut guard) = latest_frame.lock() {
        *guard = None;
    }
    info!(path, "V4L2 capture loop stopped");
}

/// Valid part of a dequeued buffer
fn used_bytes(buf: &[u8], bytesused: u32) -> &[u8] {
    let used = (bytesused as usize).min(buf.len());
    if used == 0 { buf } else { &buf[..used] }
}

/// Counts consecutive capture failures
///
/// A run of failures means the device went away (unplugged, driver reset);
/// a single good frame resets the count.
#[derive(Debug)]
struct ErrorBudget {
    consecutive: u32,
    limit: u32,
}

impl ErrorBudget {
    fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit: limit.max(1),
        }
    }

    fn success(&mut self) {
        self.consecutive = 0;
    }

    /// Record a failure; returns true once the budget is used up
    fn failure(&mut self) -> bool {
        self.consecutive += 1;
        self.exhausted()
    }

    fn exhausted(&self) -> bool {
        self.consecutive >= self.limit
    }
}

fn negotiate_format(
    dev: &Device,
    width: u32,
    height: u32,
    candidates: &[FourCC],
) -> BackendResult<Format> {
    for fourcc in candidates {
        let requested = Format::new(width, height, *fourcc);
        match dev.set_format(&requested) {
            Ok(actual) if actual.fourcc == *fourcc => return Ok(actual),
            Ok(actual) => {
                debug!(requested = %fourcc, got = %actual.fourcc, "Driver substituted format");
            }
            Err(e) => debug!(requested = %fourcc, error = %e, "Format rejected"),
        }
    }
    Err(BackendError::FormatNotSupported(
        "device offers neither YUYV nor MJPEG".into(),
    ))
}

/// Provider for V4L2 devices
pub struct V4l2Provider {
    options: ProviderOptions,
    devices: Vec<CameraDevice>,
    sessions: Mutex<HashMap<StreamId, V4l2Session>>,
    next_id: AtomicU64,
}

impl V4l2Provider {
    pub fn new(options: ProviderOptions) -> Self {
        let devices = enumerate_v4l2_cameras();
        info!(count = devices.len(), "V4L2 provider ready");
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

        let (width, height) = (self.options.width, self.options.height);
        let thread_device = device.clone();
        let session = tokio::task::spawn_blocking(move || {
            V4l2Session::start(device_index, &thread_device, width, height)
        })
        .await
        .map_err(|e| BackendError::Other(format!("acquire task failed: {}", e)))??;

        let id = StreamId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sessions
            .lock()
            .map_err(|_| BackendError::Other("session table poisoned".into()))?
            .insert(id, session);

        info!(%id, device = %device.name, "V4L2 stream opened");
        Ok(StreamHandle::new(id, device))
    }

    fn take_session(&self, id: StreamId) -> Option<V4l2Session> {
        self.sessions.lock().ok()?.remove(&id)
    }
}

#[async_trait]
impl SessionProvider for V4l2Provider {
    async fn acquire(&self, preferred: Facing) -> BackendResult<StreamHandle> {
        let index = select_device(&self.devices, preferred)
            .ok_or_else(|| BackendError::NotAvailable("no V4L2 cameras found".into()))?;
        self.open(index).await
    }

    fn release(&self, handle: StreamHandle) {
        match self.take_session(handle.id()) {
            // Dropping the session joins the capture thread
            Some(session) => {
                drop(session);
                debug!(id = %handle.id(), "V4L2 stream released");
            }
            None => warn!(id = %handle.id(), "Release of unknown V4L2 stream"),
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
        let current = session.device_index;

        // Join the old capture thread before the next device is opened
        tokio::task::spawn_blocking(move || drop(session))
            .await
            .map_err(|e| BackendError::Other(format!("release task failed: {}", e)))?;

        let next = (current + 1) % self.devices.len().max(1);
        info!(from = current, to = next, "Switching V4L2 camera");
        self.open(next).await
    }

    fn has_multiple_devices(&self) -> bool {
        self.devices.len() > 1
    }

    fn preview_frame(&self, stream: StreamId) -> Option<CameraFrame> {
        let sessions = self.sessions.lock().ok()?;
        sessions.get(&stream)?.latest()
    }

    fn devices(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_budget_stops_after_consecutive_failures() {
        let mut errors = ErrorBudget::new(3);
        assert!(!errors.failure());
        assert!(!errors.failure());
        assert!(errors.failure());
        assert!(errors.exhausted());
    }

    #[test]
    fn test_error_budget_resets_on_frame() {
        let mut errors = ErrorBudget::new(2);
        assert!(!errors.failure());
        errors.success();
        assert!(!errors.failure());
        assert!(!errors.exhausted());
    }

    #[test]
    fn test_used_bytes_trims_to_payload() {
        let buf = [1u8, 2, 3, 4];
        assert_eq!(used_bytes(&buf, 2), &[1, 2]);
        assert_eq!(used_bytes(&buf, 0), &buf);
        assert_eq!(used_bytes(&buf, 10), &buf);
    }

    #[test]
    fn test_frame_poll_is_shorter_than_acquisition() {
        assert!(timing::FIRST_FRAME_TIMEOUT < timing::ACQUIRE_TIMEOUT);
        assert!(timing::FRAME_POLL_TIMEOUT < timing::FIRST_FRAME_TIMEOUT);
    }
}
