// SPDX-License-Identifier: GPL-3.0-only

//! Stream lifecycle handlers
//!
//! Handles mount and unmount, stream acquisition, retake and device switching.

use crate::app::state::{CaptureScreen, CaptureState, Lifecycle, Message, Task};
use crate::backends::camera::{BackendResult, StreamHandle};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl CaptureScreen {
    // =========================================================================
    // Stream Lifecycle Handlers
    // =========================================================================

    /// Mount the screen and request a stream with the preferred facing
    pub fn mount(&mut self) -> Task {
        if self.lifecycle != Lifecycle::Created {
            warn!(lifecycle = ?self.lifecycle, "Mount ignored");
            return Task::none();
        }
        self.lifecycle = Lifecycle::Mounted;
        info!(facing = %self.options.preferred_facing, "Capture screen mounted");
        self.request_stream()
    }

    /// Tear down: cancel pending work and release the stream
    pub fn unmount(&mut self) {
        if self.lifecycle == Lifecycle::Unmounted {
            return;
        }
        self.lifecycle = Lifecycle::Unmounted;
        self.cancel.cancel();
        self.release_stream();
        info!(state = self.state.name(), "Capture screen unmounted");
    }

    /// Drop the current image or error and start streaming again
    pub fn retake(&mut self) -> Task {
        if !self.is_mounted() {
            warn!("Retake ignored: screen not mounted");
            return Task::none();
        }
        info!(from = self.state.name(), "Retake requested");

        // One acquisition at a time: give the old stream back first
        self.release_stream();
        self.notice = None;
        self.set_state(CaptureState::Idle);
        self.request_stream()
    }

    /// Move the live stream to the next camera
    pub fn switch_device(&mut self) -> Task {
        if !self.is_mounted() || !self.state.is_streaming() || !self.device_capability() {
            debug!(state = self.state.name(), "Switch ignored");
            return Task::none();
        }
        let Some(handle) = self.stream.take() else {
            debug!("Switch ignored: a switch is already in progress");
            return Task::none();
        };

        info!(from = %handle.device().name, "Switching camera");
        let generation = self.next_generation();
        let provider = Arc::clone(&self.deps.provider);
        let token = self.cancel.clone();

        Task::perform(async move {
            let result = provider.switch_device(handle).await;
            if token.is_cancelled() {
                if let Ok(handle) = result {
                    provider.release(handle);
                }
                return Message::Cancelled;
            }
            Message::DeviceSwitched { generation, result }
        })
    }

    /// Start an acquisition that supersedes any pending one
    fn request_stream(&mut self) -> Task {
        let generation = self.next_generation();
        let provider = Arc::clone(&self.deps.provider);
        let token = self.cancel.clone();
        let facing = self.options.preferred_facing;

        // Acquisition runs to completion so a late handle can still be released
        Task::perform(async move {
            let result = provider.acquire(facing).await;
            if token.is_cancelled() {
                if let Ok(handle) = result {
                    debug!(id = %handle.id(), "Releasing stream acquired after unmount");
                    provider.release(handle);
                }
                return Message::Cancelled;
            }
            Message::Acquired { generation, result }
        })
    }

    /// Apply the result of an acquisition or device switch
    pub(crate) fn handle_stream_result(
        &mut self,
        generation: u64,
        result: BackendResult<StreamHandle>,
    ) -> Task {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale stream result");
            if let Ok(handle) = result {
                self.deps.provider.release(handle);
            }
            return Task::none();
        }

        match result {
            Ok(handle) => {
                info!(id = %handle.id(), device = %handle.device().name, "Streaming");
                self.release_stream();
                self.stream = Some(handle);
                self.set_state(CaptureState::Streaming);
            }
            Err(e) => {
                warn!(error = %e, "Camera acquisition failed");
                self.release_stream();
                self.set_state(CaptureState::Error(e.message()));
            }
        }
        Task::none()
    }
}
