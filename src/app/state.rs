// SPDX-License-Identifier: GPL-3.0-only

//! Capture screen state management

use crate::backends::camera::{
    BackendResult, CameraFrame, Facing, SessionProvider, StreamHandle, StreamId,
};
use crate::config::Config;
use crate::constants::{ANALYSIS_ROUTE, file_formats};
use crate::errors::DecodeError;
use crate::media::Image;
use crate::storage::HandoffSlot;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Capture state machine
///
/// Exactly one variant holds at a time. `Captured` is only entered from
/// `Streaming`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    /// Waiting for a stream (before mount, or while acquisition is pending)
    #[default]
    Idle,
    /// Live stream available
    Streaming,
    /// Acquisition failed; the message is shown to the user
    Error(String),
    /// A still image is held for review
    Captured(Image),
}

impl CaptureState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, CaptureState::Streaming)
    }

    pub fn is_captured(&self) -> bool {
        matches!(self, CaptureState::Captured(_))
    }

    pub fn captured_image(&self) -> Option<&Image> {
        match self {
            CaptureState::Captured(image) => Some(image),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            CaptureState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Streaming => "streaming",
            CaptureState::Error(_) => "error",
            CaptureState::Captured(_) => "captured",
        }
    }
}

/// Screen lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built but not yet mounted
    Created,
    /// Mounted and accepting operations
    Mounted,
    /// Torn down; late results are dropped
    Unmounted,
}

/// Results of asynchronous operations, fed back through `update`
#[derive(Debug)]
pub enum Message {
    /// Stream acquisition resolved
    Acquired {
        generation: u64,
        result: BackendResult<StreamHandle>,
    },
    /// Device switch resolved
    DeviceSwitched {
        generation: u64,
        result: BackendResult<StreamHandle>,
    },
    /// Frame capture resolved
    FrameCaptured {
        generation: u64,
        image: Option<Image>,
    },
    /// File picker closed
    FileChosen(Option<PathBuf>),
    /// Uploaded file decoded
    FileDecoded {
        generation: u64,
        result: Result<Image, DecodeError>,
    },
    /// The operation was abandoned because the screen was torn down
    Cancelled,
}

/// A pending asynchronous operation
///
/// Resolve the future and pass its message to [`CaptureScreen::update`].
#[must_use = "tasks do nothing unless awaited and their message passed to update"]
pub struct Task(Option<BoxFuture<'static, Message>>);

impl Task {
    /// No follow-up work
    pub fn none() -> Self {
        Self(None)
    }

    /// Wrap a future producing a message
    pub fn perform<F>(future: F) -> Self
    where
        F: Future<Output = Message> + Send + 'static,
    {
        Self(Some(future.boxed()))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn into_future(self) -> Option<BoxFuture<'static, Message>> {
        self.0
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_some() {
            write!(f, "Task(pending)")
        } else {
            write!(f, "Task(none)")
        }
    }
}

/// Screens reachable from the capture screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Analysis of the handed-off image
    Analyzing,
    /// Previous screen
    Back,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Analyzing => ANALYSIS_ROUTE,
            Route::Back => "..",
        }
    }
}

/// Receives navigation requests from the screen
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that forwards routes over a channel to the event loop
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    sender: std::sync::mpsc::Sender<Route>,
}

impl ChannelNavigator {
    pub fn new(sender: std::sync::mpsc::Sender<Route>) -> Self {
        Self { sender }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        if self.sender.send(route).is_err() {
            warn!(route = route.path(), "Navigation receiver is gone");
        }
    }
}

/// Lets the user pick an image file to upload
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick_image(&self) -> Option<PathBuf>;
}

/// Native file dialog
#[derive(Debug, Default, Clone, Copy)]
pub struct RfdFilePicker;

#[async_trait]
impl FilePicker for RfdFilePicker {
    async fn pick_image(&self) -> Option<PathBuf> {
        let mut dialog = rfd::AsyncFileDialog::new()
            .set_title("Choose a leaf photo")
            .add_filter("Images", file_formats::IMAGE_EXTENSIONS);
        if let Some(dir) = dirs::picture_dir()
            && dir.exists()
        {
            dialog = dialog.set_directory(&dir);
        }
        dialog.pick_file().await.map(|h| h.path().to_path_buf())
    }
}

/// Collaborators injected into the screen; each can be faked in tests
#[derive(Clone)]
pub struct ScreenDependencies {
    pub provider: Arc<dyn SessionProvider>,
    pub handoff: HandoffSlot,
    pub navigator: Arc<dyn Navigator>,
    pub picker: Arc<dyn FilePicker>,
}

/// Screen settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenOptions {
    pub preferred_facing: Facing,
    pub preview_max_edge: u32,
}

impl ScreenOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            preferred_facing: config.preferred_facing,
            preview_max_edge: config.preview_max_edge,
        }
    }
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The capture screen orchestrator
///
/// Owns the capture state, the single stream handle and the cancellation
/// token every pending task is bound to.
pub struct CaptureScreen {
    pub(crate) deps: ScreenDependencies,
    pub(crate) options: ScreenOptions,
    pub(crate) state: CaptureState,
    pub(crate) stream: Option<StreamHandle>,
    /// Bumped by every request that supersedes earlier results
    pub(crate) generation: u64,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) cancel: CancellationToken,
    /// Transient user-facing message (rejected upload, failed handoff)
    pub(crate) notice: Option<String>,
}

impl CaptureScreen {
    pub fn new(deps: ScreenDependencies, options: ScreenOptions) -> Self {
        Self {
            deps,
            options,
            state: CaptureState::Idle,
            stream: None,
            generation: 0,
            lifecycle: Lifecycle::Created,
            cancel: CancellationToken::new(),
            notice: None,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle == Lifecycle::Mounted
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Whether there is more than one camera to switch between
    pub fn device_capability(&self) -> bool {
        self.deps.provider.has_multiple_devices()
    }

    /// Identifier of the held stream, if any
    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream.as_ref().map(StreamHandle::id)
    }

    /// Name of the device the held stream belongs to
    pub fn device_name(&self) -> Option<&str> {
        self.stream.as_ref().map(|s| s.device().name.as_str())
    }

    /// Latest frame of the live stream; `None` unless streaming
    pub fn live_frame(&self) -> Option<CameraFrame> {
        if !self.state.is_streaming() {
            return None;
        }
        let stream = self.stream_id()?;
        self.deps.provider.preview_frame(stream)
    }

    pub(crate) fn set_state(&mut self, state: CaptureState) {
        debug!(from = self.state.name(), to = state.name(), "State transition");
        self.state = state;
    }

    /// Start a new request generation, superseding every pending result
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Bind a future to the screen's cancellation token
    pub(crate) fn cancellable<F>(&self, future: F) -> Task
    where
        F: Future<Output = Message> + Send + 'static,
    {
        let token = self.cancel.clone();
        Task::perform(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Message::Cancelled,
                message = future => message,
            }
        })
    }

    /// Give the held stream back to the provider
    pub(crate) fn release_stream(&mut self) {
        if let Some(handle) = self.stream.take() {
            debug!(id = %handle.id(), "Releasing stream");
            self.deps.provider.release(handle);
        }
    }
}

impl Drop for CaptureScreen {
    fn drop(&mut self) {
        if self.is_mounted() {
            self.unmount();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_helpers() {
        assert!(CaptureState::Streaming.is_streaming());
        assert!(!CaptureState::Idle.is_captured());
        assert_eq!(
            CaptureState::Error("denied".into()).error_message(),
            Some("denied")
        );
        assert_eq!(CaptureState::default(), CaptureState::Idle);
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Analyzing.path(), "/analyzing");
    }

    #[test]
    fn test_channel_navigator_forwards() {
        let (tx, rx) = std::sync::mpsc::channel();
        ChannelNavigator::new(tx).navigate(Route::Analyzing);
        assert_eq!(rx.try_recv(), Ok(Route::Analyzing));
    }

    #[tokio::test]
    async fn test_task_none_and_perform() {
        assert!(Task::none().is_none());
        let task = Task::perform(async { Message::Cancelled });
        let message = task.into_future().unwrap().await;
        assert!(matches!(message, Message::Cancelled));
    }
}
