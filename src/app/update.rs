// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! The `update()` function routes the results of asynchronous work to the
//! handler methods, while `handle_intent()` routes user actions coming from
//! the controls. Handlers are implemented in the `handlers` submodules:
//!
//! - `handlers::camera`: mount, unmount, acquisition, retake, device switching
//! - `handlers::capture`: frame capture, uploads, confirm and back

use crate::app::controls::Intent;
use crate::app::state::{CaptureScreen, Message, Task};
use crate::errors::CaptureError;
use tracing::{debug, error};

impl CaptureScreen {
    /// Main message handler
    ///
    /// After unmount every message is dropped; stream handles they carry are
    /// given back to the provider.
    pub fn update(&mut self, message: Message) -> Task {
        if !self.is_mounted() {
            match message {
                Message::Acquired { result: Ok(handle), .. }
                | Message::DeviceSwitched { result: Ok(handle), .. } => {
                    debug!(id = %handle.id(), "Releasing stream delivered after unmount");
                    self.deps.provider.release(handle);
                }
                other => debug!(message = ?other, "Ignoring message while not mounted"),
            }
            return Task::none();
        }

        match message {
            Message::Acquired { generation, result }
            | Message::DeviceSwitched { generation, result } => {
                self.handle_stream_result(generation, result)
            }
            Message::FrameCaptured { generation, image } => {
                self.handle_frame_captured(generation, image)
            }
            Message::FileChosen(path) => self.handle_file_chosen(path),
            Message::FileDecoded { generation, result } => {
                self.handle_file_decoded(generation, result)
            }
            Message::Cancelled => Task::none(),
        }
    }

    /// Dispatch a user action from the controls
    pub fn handle_intent(&mut self, intent: Intent) -> Task {
        debug!(?intent, state = self.state.name(), "Intent");
        match intent {
            Intent::Capture => self.capture(),
            Intent::SwitchDevice => self.switch_device(),
            Intent::Upload => self.request_upload(),
            Intent::Retake => self.retake(),
            Intent::Confirm => {
                match self.confirm() {
                    Ok(()) => {}
                    // Controls only offer confirm for a captured image
                    Err(CaptureError::NoImage) => {
                        error!(state = self.state.name(), "Confirm without a captured image")
                    }
                    Err(CaptureError::Unmounted) => debug!("Confirm after unmount"),
                    Err(e) => debug!(error = %e, "Confirm failed"),
                }
                Task::none()
            }
            Intent::Back => {
                self.back();
                Task::none()
            }
        }
    }

    /// Drive a task chain to completion on the current runtime
    ///
    /// Used by headless callers and tests; the interactive loop spawns tasks
    /// instead so input stays responsive.
    pub async fn settle(&mut self, mut task: Task) {
        while let Some(future) = task.into_future() {
            let message = future.await;
            task = self.update(message);
        }
    }
}
