// SPDX-License-Identifier: GPL-3.0-only

//! Still image handlers
//!
//! Handles frame capture, file uploads, confirmation and handoff.

use crate::app::state::{CaptureScreen, CaptureState, Message, Route, Task};
use crate::errors::{CaptureError, DecodeError};
use crate::media::Image;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl CaptureScreen {
    // =========================================================================
    // Capture Handlers
    // =========================================================================

    /// Grab a still from the live stream
    pub fn capture(&mut self) -> Task {
        if !self.is_mounted() || !self.state.is_streaming() {
            debug!(state = self.state.name(), "Capture ignored");
            return Task::none();
        }
        let Some(stream) = self.stream_id() else {
            debug!("Capture ignored: no stream held");
            return Task::none();
        };

        info!(%stream, "Capturing frame");
        let generation = self.generation;
        let provider = Arc::clone(&self.deps.provider);
        self.cancellable(async move {
            let image = provider.capture_frame(stream).await;
            Message::FrameCaptured { generation, image }
        })
    }

    pub(crate) fn handle_frame_captured(&mut self, generation: u64, image: Option<Image>) -> Task {
        if generation != self.generation || !self.state.is_streaming() {
            debug!(generation, state = self.state.name(), "Discarding stale frame");
            return Task::none();
        }
        match image {
            Some(image) => {
                info!(width = image.width(), height = image.height(), "Frame captured");
                // The stream stays open so retake can resume it
                self.set_state(CaptureState::Captured(image));
            }
            None => warn!("Camera returned no frame"),
        }
        Task::none()
    }

    // =========================================================================
    // Upload Handlers
    // =========================================================================

    /// Ask the file picker for an image to upload
    pub fn request_upload(&mut self) -> Task {
        if !self.is_mounted() {
            return Task::none();
        }
        let picker = Arc::clone(&self.deps.picker);
        self.cancellable(async move { Message::FileChosen(picker.pick_image().await) })
    }

    pub(crate) fn handle_file_chosen(&mut self, path: Option<PathBuf>) -> Task {
        match path {
            Some(path) => self.upload_file(path),
            None => {
                debug!("File selection cancelled");
                Task::none()
            }
        }
    }

    /// Decode a file and use it in place of a camera still
    pub fn upload_file(&mut self, path: PathBuf) -> Task {
        if !self.is_mounted() {
            return Task::none();
        }
        if !self.state.is_streaming() {
            warn!(state = self.state.name(), path = %path.display(), "Upload rejected");
            self.notice = Some("Uploads are only accepted while the camera is live".into());
            return Task::none();
        }

        info!(path = %path.display(), "Decoding uploaded file");
        let generation = self.generation;
        let preview_edge = self.options.preview_max_edge;
        self.cancellable(async move {
            let result = Image::load_file(&path, preview_edge).await;
            Message::FileDecoded { generation, result }
        })
    }

    pub(crate) fn handle_file_decoded(
        &mut self,
        generation: u64,
        result: Result<Image, DecodeError>,
    ) -> Task {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale upload");
            return Task::none();
        }

        match result {
            Ok(image) if self.state.is_streaming() => {
                info!(width = image.width(), height = image.height(), "Upload accepted");
                // Supersede anything still in flight for the old stream
                self.next_generation();
                self.release_stream();
                self.notice = None;
                self.set_state(CaptureState::Captured(image));
            }
            Ok(_) => {
                warn!(state = self.state.name(), "Upload arrived after leaving the live view");
                self.notice = Some("Upload discarded: the camera is no longer live".into());
            }
            Err(e) => {
                warn!(error = %e, "Uploaded file could not be decoded");
                self.notice = Some(format!("Could not open image: {}", e));
            }
        }
        Task::none()
    }

    // =========================================================================
    // Handoff Handlers
    // =========================================================================

    /// Hand the captured image to the analysis screen
    ///
    /// Writes the data URL into session storage, navigates to the analysis
    /// route and tears the screen down. On a storage failure the image stays
    /// captured so the user can try again.
    pub fn confirm(&mut self) -> Result<(), CaptureError> {
        if !self.is_mounted() {
            return Err(CaptureError::Unmounted);
        }
        let Some(image) = self.state.captured_image() else {
            return Err(CaptureError::NoImage);
        };

        if let Err(e) = self.deps.handoff.store(image) {
            error!(error = %e, "Failed to store captured image");
            self.notice = Some(format!("Could not save image: {}", e));
            return Err(CaptureError::Storage(e));
        }

        info!(route = Route::Analyzing.path(), "Navigating to analysis");
        self.deps.navigator.navigate(Route::Analyzing);
        self.unmount();
        Ok(())
    }

    /// Leave the screen without handing anything off
    pub fn back(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.deps.navigator.navigate(Route::Back);
        self.unmount();
    }
}
