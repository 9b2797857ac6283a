// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture screen state machine

use async_trait::async_trait;
use leafscan::app::{
    CaptureScreen, CaptureState, ControlSet, FilePicker, Intent, Lifecycle, Message, Navigator,
    Route, ScreenDependencies, ScreenOptions, Task,
};
use leafscan::app::camera_preview::{Region, layers};
use leafscan::backends::camera::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFrame, Facing,
    PixelFormat, ProviderOptions, SessionProvider, StreamHandle, StreamId, get_provider,
};
use leafscan::constants::HANDOFF_KEY;
use leafscan::errors::CaptureError;
use leafscan::media::{Image, ImageSource};
use leafscan::storage::{HandoffSlot, MemoryStorage, SessionStorage};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Fakes
// =============================================================================

/// Provider with scripted results and a release ledger
struct FakeProvider {
    devices: Vec<CameraDevice>,
    acquire_results: Mutex<VecDeque<BackendResult<()>>>,
    switch_results: Mutex<VecDeque<BackendResult<()>>>,
    captures: Mutex<VecDeque<Option<Image>>>,
    open: Mutex<HashMap<StreamId, usize>>,
    released: Mutex<Vec<StreamId>>,
    acquired_facing: Mutex<Vec<Facing>>,
    next_id: AtomicU64,
}

impl FakeProvider {
    fn new(device_count: usize) -> Arc<Self> {
        let devices = (0..device_count)
            .map(|i| {
                let facing = if i == 0 { Facing::Rear } else { Facing::Front };
                CameraDevice::new(format!("Camera {}", i), format!("/dev/video{}", i), facing)
            })
            .collect();
        Arc::new(Self {
            devices,
            acquire_results: Mutex::new(VecDeque::new()),
            switch_results: Mutex::new(VecDeque::new()),
            captures: Mutex::new(VecDeque::new()),
            open: Mutex::new(HashMap::new()),
            released: Mutex::new(Vec::new()),
            acquired_facing: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    fn fail_next_acquire(&self, error: BackendError) {
        self.acquire_results.lock().unwrap().push_back(Err(error));
    }

    fn fail_next_switch(&self, error: BackendError) {
        self.switch_results.lock().unwrap().push_back(Err(error));
    }

    fn next_capture(&self, image: Option<Image>) {
        self.captures.lock().unwrap().push_back(image);
    }

    fn released(&self) -> Vec<StreamId> {
        self.released.lock().unwrap().clone()
    }

    fn open_streams(&self) -> usize {
        self.open.lock().unwrap().len()
    }

    fn open_stream(&self, device_index: usize) -> StreamHandle {
        let id = StreamId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.open.lock().unwrap().insert(id, device_index);
        StreamHandle::new(id, self.devices[device_index].clone())
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn acquire(&self, preferred: Facing) -> BackendResult<StreamHandle> {
        self.acquired_facing.lock().unwrap().push(preferred);
        if let Some(Err(e)) = self.acquire_results.lock().unwrap().pop_front() {
            return Err(e);
        }
        let index = self
            .devices
            .iter()
            .position(|d| d.facing == preferred)
            .unwrap_or(0);
        Ok(self.open_stream(index))
    }

    fn release(&self, handle: StreamHandle) {
        self.open.lock().unwrap().remove(&handle.id());
        self.released.lock().unwrap().push(handle.id());
    }

    async fn capture_frame(&self, _stream: StreamId) -> Option<Image> {
        self.captures
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some(leaf_image([40, 160, 60])))
    }

    async fn switch_device(&self, handle: StreamHandle) -> BackendResult<StreamHandle> {
        let current = self.open.lock().unwrap().remove(&handle.id()).unwrap_or(0);
        self.released.lock().unwrap().push(handle.id());
        if let Some(Err(e)) = self.switch_results.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(self.open_stream((current + 1) % self.devices.len()))
    }

    fn has_multiple_devices(&self) -> bool {
        self.devices.len() > 1
    }

    fn preview_frame(&self, stream: StreamId) -> Option<CameraFrame> {
        // Each device paints a different gray level so the tests can tell them apart
        let index = *self.open.lock().unwrap().get(&stream)?;
        let level = 50 + 100 * index as u8;
        Some(CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![level; 4]))
    }

    fn devices(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }
}

#[derive(Default)]
struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

struct FixedPicker(Option<PathBuf>);

#[async_trait]
impl FilePicker for FixedPicker {
    async fn pick_image(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

/// Storage whose writes always fail
struct ReadOnlyStorage;

impl SessionStorage for ReadOnlyStorage {
    fn set_item(&self, _key: &str, _value: &str) -> Result<(), leafscan::errors::StorageError> {
        Err(leafscan::errors::StorageError::Io("read-only".into()))
    }

    fn get_item(&self, _key: &str) -> Result<Option<String>, leafscan::errors::StorageError> {
        Ok(None)
    }
}

struct Harness {
    screen: CaptureScreen,
    provider: Arc<FakeProvider>,
    storage: MemoryStorage,
    navigator: Arc<RecordingNavigator>,
}

fn harness_with(provider: Arc<FakeProvider>, picked: Option<PathBuf>) -> Harness {
    let storage = MemoryStorage::new();
    let navigator = Arc::new(RecordingNavigator::default());
    let deps = ScreenDependencies {
        provider: provider.clone(),
        handoff: HandoffSlot::new(Arc::new(storage.clone())),
        navigator: navigator.clone(),
        picker: Arc::new(FixedPicker(picked)),
    };
    Harness {
        screen: CaptureScreen::new(deps, ScreenOptions::default()),
        provider,
        storage,
        navigator,
    }
}

fn harness(device_count: usize) -> Harness {
    harness_with(FakeProvider::new(device_count), None)
}

fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 3, image::Rgb(color));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn leaf_image(color: [u8; 3]) -> Image {
    Image::decode(png_bytes(color), ImageSource::Camera, 32).unwrap()
}

fn write_png(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(color)).unwrap();
    path
}

async fn mounted(h: &mut Harness) {
    let task = h.screen.mount();
    h.screen.settle(task).await;
}

async fn resolve(task: Task) -> Message {
    task.into_future().expect("task should be pending").await
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_mount_capture_confirm_hands_off_once() {
    let mut h = harness(1);
    mounted(&mut h).await;
    assert_eq!(h.screen.state(), &CaptureState::Streaming);
    assert_eq!(
        h.provider.acquired_facing.lock().unwrap().as_slice(),
        &[Facing::Rear]
    );

    let x = leaf_image([10, 200, 30]);
    h.provider.next_capture(Some(x.clone()));
    let task = h.screen.capture();
    h.screen.settle(task).await;
    assert_eq!(h.screen.state(), &CaptureState::Captured(x.clone()));

    h.screen.confirm().unwrap();
    let stored = h.storage.get_item(HANDOFF_KEY).unwrap().unwrap();
    assert_eq!(stored, x.to_data_url());
    assert_eq!(h.navigator.routes(), vec![Route::Analyzing]);
    assert_eq!(h.screen.lifecycle(), Lifecycle::Unmounted);

    // A second confirm neither writes nor navigates again
    assert!(matches!(h.screen.confirm(), Err(CaptureError::Unmounted)));
    assert_eq!(h.navigator.routes(), vec![Route::Analyzing]);
    assert_eq!(h.provider.open_streams(), 0);
}

#[tokio::test]
async fn test_permission_denied_then_retake_streams() {
    let mut h = harness(1);
    h.provider
        .fail_next_acquire(BackendError::PermissionDenied("permission denied".into()));
    mounted(&mut h).await;

    // The provider's message is shown as-is
    assert_eq!(
        h.screen.state(),
        &CaptureState::Error("permission denied".into())
    );

    let task = h.screen.retake();
    assert_eq!(h.screen.state(), &CaptureState::Idle);
    h.screen.settle(task).await;
    assert_eq!(h.screen.state(), &CaptureState::Streaming);
}

#[tokio::test]
async fn test_switch_device_keeps_streaming_on_new_device() {
    let mut h = harness(2);
    mounted(&mut h).await;
    let before = h.screen.live_frame().unwrap();
    let first_stream = h.screen.stream_id().unwrap();

    let task = h.screen.switch_device();
    h.screen.settle(task).await;

    assert_eq!(h.screen.state(), &CaptureState::Streaming);
    assert_ne!(h.screen.stream_id(), Some(first_stream));
    assert_eq!(h.screen.device_name(), Some("Camera 1"));
    let after = h.screen.live_frame().unwrap();
    assert_ne!(before.sample_rgb(0, 0), after.sample_rgb(0, 0));
    assert_eq!(h.provider.open_streams(), 1);
}

#[tokio::test]
async fn test_switch_failure_enters_error() {
    let mut h = harness(2);
    mounted(&mut h).await;
    h.provider
        .fail_next_switch(BackendError::Busy("in use by another application".into()));

    let task = h.screen.switch_device();
    h.screen.settle(task).await;

    assert!(h.screen.state().error_message().is_some());
    assert_eq!(h.screen.stream_id(), None);
}

#[tokio::test]
async fn test_switch_ignored_with_single_device() {
    let mut h = harness(1);
    mounted(&mut h).await;
    assert!(!h.screen.device_capability());
    assert!(h.screen.switch_device().is_none());
    assert_eq!(h.screen.state(), &CaptureState::Streaming);
}

#[tokio::test]
async fn test_retake_from_captured_shows_live_not_stale_image() {
    let mut h = harness(1);
    mounted(&mut h).await;
    let task = h.screen.capture();
    h.screen.settle(task).await;
    assert!(h.screen.state().is_captured());

    let task = h.screen.retake();
    assert!(!h.screen.state().is_captured());
    h.screen.settle(task).await;

    assert_eq!(h.screen.state(), &CaptureState::Streaming);
    let live = h.screen.live_frame();
    let view = layers(h.screen.state(), live.as_ref());
    assert!(matches!(view.region, Region::Live(Some(_))));
    // Exactly one stream is held after the old one was given back
    assert_eq!(h.provider.open_streams(), 1);
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_capture_without_frame_stays_streaming() {
    let mut h = harness(1);
    mounted(&mut h).await;
    h.provider.next_capture(None);

    let task = h.screen.capture();
    h.screen.settle(task).await;
    assert_eq!(h.screen.state(), &CaptureState::Streaming);
}

#[tokio::test]
async fn test_capture_and_upload_race_yields_single_capture() {
    let dir = tempfile::tempdir().unwrap();
    let upload = write_png(dir.path(), "leaf.png", [0, 255, 0]);
    let mut h = harness(1);
    mounted(&mut h).await;

    let camera = h.screen.capture();
    let file = h.screen.upload_file(upload);
    let camera_message = resolve(camera).await;
    let file_message = resolve(file).await;

    let _ = h.screen.update(camera_message);
    assert!(h.screen.state().is_captured());
    let _ = h.screen.update(file_message);

    // The camera still won; the late upload did not replace it
    let image = h.screen.state().captured_image().unwrap();
    assert_eq!(image.source(), ImageSource::Camera);
    assert!(h.screen.notice().is_some());
}

#[tokio::test]
async fn test_upload_wins_race_when_decoded_first() {
    let dir = tempfile::tempdir().unwrap();
    let upload = write_png(dir.path(), "leaf.png", [0, 255, 0]);
    let mut h = harness(1);
    mounted(&mut h).await;
    let stream = h.screen.stream_id().unwrap();

    let camera = h.screen.capture();
    let file = h.screen.upload_file(upload);
    let camera_message = resolve(camera).await;
    let file_message = resolve(file).await;

    let _ = h.screen.update(file_message);
    assert_eq!(
        h.screen.state().captured_image().unwrap().source(),
        ImageSource::Upload
    );
    assert_eq!(h.provider.released(), vec![stream]);
    assert_eq!(h.provider.open_streams(), 0);

    // The camera frame belongs to the released stream and is dropped
    let _ = h.screen.update(camera_message);
    assert_eq!(
        h.screen.state().captured_image().unwrap().source(),
        ImageSource::Upload
    );
    assert_eq!(h.provider.released(), vec![stream]);
    assert_eq!(h.provider.open_streams(), 0);
}

#[tokio::test]
async fn test_confirm_without_capture_is_rejected() {
    let mut h = harness(1);
    mounted(&mut h).await;

    assert!(matches!(h.screen.confirm(), Err(CaptureError::NoImage)));
    assert!(h.navigator.routes().is_empty());
    assert_eq!(h.storage.get_item(HANDOFF_KEY).unwrap(), None);

    // Through the controls it is logged and ignored
    let task = h.screen.handle_intent(Intent::Confirm);
    assert!(task.is_none());
    assert_eq!(h.screen.state(), &CaptureState::Streaming);
}

#[tokio::test]
async fn test_confirm_storage_failure_keeps_image() {
    let provider = FakeProvider::new(1);
    let navigator = Arc::new(RecordingNavigator::default());
    let deps = ScreenDependencies {
        provider: provider.clone(),
        handoff: HandoffSlot::new(Arc::new(ReadOnlyStorage)),
        navigator: navigator.clone(),
        picker: Arc::new(FixedPicker(None)),
    };
    let mut screen = CaptureScreen::new(deps, ScreenOptions::default());
    let task = screen.mount();
    screen.settle(task).await;
    let task = screen.capture();
    screen.settle(task).await;

    assert!(matches!(screen.confirm(), Err(CaptureError::Storage(_))));
    assert!(screen.state().is_captured());
    assert!(screen.is_mounted());
    assert!(navigator.routes().is_empty());
    assert!(screen.notice().is_some());
}

#[tokio::test]
async fn test_upload_releases_stream_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let upload = write_png(dir.path(), "leaf.png", [0, 255, 0]);
    let mut h = harness(1);
    mounted(&mut h).await;
    let stream = h.screen.stream_id().unwrap();

    let task = h.screen.upload_file(upload);
    h.screen.settle(task).await;

    let image = h.screen.state().captured_image().unwrap();
    assert_eq!(image.source(), ImageSource::Upload);
    assert_eq!(h.provider.released(), vec![stream]);

    // Tearing down afterwards does not release it again
    h.screen.unmount();
    assert_eq!(h.provider.released(), vec![stream]);
}

#[tokio::test]
async fn test_upload_via_picker_intent() {
    let dir = tempfile::tempdir().unwrap();
    let upload = write_png(dir.path(), "picked.png", [90, 200, 90]);
    let mut h = harness_with(FakeProvider::new(1), Some(upload));
    mounted(&mut h).await;

    let task = h.screen.handle_intent(Intent::Upload);
    h.screen.settle(task).await;
    assert!(h.screen.state().is_captured());
}

#[tokio::test]
async fn test_undecodable_upload_keeps_streaming() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("notes.png");
    std::fs::write(&bogus, b"definitely not an image").unwrap();
    let mut h = harness(1);
    mounted(&mut h).await;
    let stream = h.screen.stream_id();

    let task = h.screen.upload_file(bogus);
    h.screen.settle(task).await;

    assert_eq!(h.screen.state(), &CaptureState::Streaming);
    assert_eq!(h.screen.stream_id(), stream);
    assert!(h.provider.released().is_empty());
    assert!(h.screen.notice().unwrap().contains("Could not open image"));
}

#[tokio::test]
async fn test_upload_outside_streaming_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let upload = write_png(dir.path(), "leaf.png", [0, 255, 0]);
    let mut h = harness(1);
    h.provider
        .fail_next_acquire(BackendError::NotAvailable("no cameras".into()));
    mounted(&mut h).await;

    let task = h.screen.upload_file(upload);
    assert!(task.is_none());
    assert!(h.screen.state().error_message().is_some());
    assert!(h.screen.notice().is_some());
}

#[tokio::test]
async fn test_unmount_during_pending_acquire() {
    let mut h = harness(1);
    let pending = h.screen.mount();
    h.screen.unmount();

    // The acquisition finishes late; its stream goes straight back
    let message = resolve(pending).await;
    assert!(matches!(message, Message::Cancelled));
    let _ = h.screen.update(message);

    assert_eq!(h.screen.state(), &CaptureState::Idle);
    assert_eq!(h.provider.released().len(), 1);
    assert_eq!(h.provider.open_streams(), 0);
}

#[tokio::test]
async fn test_unmount_during_pending_switch_releases_new_stream() {
    let mut h = harness(2);
    mounted(&mut h).await;
    let old = h.screen.stream_id().unwrap();

    let pending = h.screen.switch_device();
    h.screen.unmount();

    let message = resolve(pending).await;
    assert!(matches!(message, Message::Cancelled));
    let _ = h.screen.update(message);

    // Both the old and the late new stream went back, and nothing is left open
    let released = h.provider.released();
    assert_eq!(released.len(), 2);
    assert_eq!(released[0], old);
    assert_eq!(h.screen.stream_id(), None);
    assert_eq!(h.provider.open_streams(), 0);
}

#[tokio::test]
async fn test_late_message_after_unmount_is_released_not_applied() {
    let mut h = harness(1);
    let pending = h.screen.mount();
    let message = resolve(pending).await;
    assert!(matches!(message, Message::Acquired { result: Ok(_), .. }));

    h.screen.unmount();
    let _ = h.screen.update(message);

    assert_eq!(h.screen.state(), &CaptureState::Idle);
    assert_eq!(h.screen.stream_id(), None);
    assert_eq!(h.provider.open_streams(), 0);
}

#[tokio::test]
async fn test_unmount_cancels_pending_capture() {
    let mut h = harness(1);
    mounted(&mut h).await;
    let pending = h.screen.capture();
    h.screen.unmount();

    let message = resolve(pending).await;
    assert!(matches!(message, Message::Cancelled));
    assert_eq!(h.screen.state(), &CaptureState::Streaming);
    assert_eq!(h.provider.open_streams(), 0);
}

#[tokio::test]
async fn test_stale_acquisition_is_released() {
    let mut h = harness(1);
    let first = h.screen.mount();
    let second = h.screen.retake();

    let latest = resolve(second).await;
    let stale = resolve(first).await;
    let _ = h.screen.update(latest);
    let current = h.screen.stream_id().unwrap();
    let _ = h.screen.update(stale);

    assert_eq!(h.screen.state(), &CaptureState::Streaming);
    assert_eq!(h.screen.stream_id(), Some(current));
    assert_eq!(h.provider.open_streams(), 1);
    assert_eq!(h.provider.released().len(), 1);
}

#[tokio::test]
async fn test_back_navigates_and_releases() {
    let mut h = harness(1);
    mounted(&mut h).await;

    let task = h.screen.handle_intent(Intent::Back);
    assert!(task.is_none());
    assert_eq!(h.navigator.routes(), vec![Route::Back]);
    assert_eq!(h.screen.lifecycle(), Lifecycle::Unmounted);
    assert_eq!(h.provider.open_streams(), 0);
}

#[tokio::test]
async fn test_drop_releases_stream() {
    let mut h = harness(1);
    mounted(&mut h).await;
    let provider = h.provider.clone();
    drop(h);
    assert_eq!(provider.open_streams(), 0);
}

#[tokio::test]
async fn test_controls_follow_state() {
    let mut h = harness(2);
    mounted(&mut h).await;
    let set = ControlSet::for_state(h.screen.state(), h.screen.device_capability());
    let labels: Vec<_> = set.buttons().iter().map(|b| b.label).collect();
    assert_eq!(labels, ["Flip", "Capture", "Gallery"]);

    let task = h.screen.handle_intent(Intent::Capture);
    h.screen.settle(task).await;
    let set = ControlSet::for_state(h.screen.state(), h.screen.device_capability());
    assert!(matches!(set, ControlSet::Review { .. }));
}

// =============================================================================
// Still image provider end to end
// =============================================================================

#[tokio::test]
async fn test_still_image_provider_flow() {
    let dir = tempfile::tempdir().unwrap();
    let rear = write_png(dir.path(), "rear-field.png", [20, 140, 20]);
    let front = write_png(dir.path(), "front-bench.png", [200, 40, 40]);

    let options = ProviderOptions {
        source_paths: vec![front, rear],
        ..ProviderOptions::from_config(&leafscan::Config::default())
    };
    let provider = get_provider(CameraBackendType::StillImages, options);
    assert!(provider.has_multiple_devices());

    let storage = MemoryStorage::new();
    let navigator = Arc::new(RecordingNavigator::default());
    let deps = ScreenDependencies {
        provider,
        handoff: HandoffSlot::new(Arc::new(storage.clone())),
        navigator: navigator.clone(),
        picker: Arc::new(FixedPicker(None)),
    };
    let mut screen = CaptureScreen::new(deps, ScreenOptions::default());

    let task = screen.mount();
    screen.settle(task).await;
    assert_eq!(screen.device_name(), Some("rear-field"));

    let task = screen.capture();
    screen.settle(task).await;
    assert!(screen.state().is_captured());
    screen.confirm().unwrap();

    let slot = HandoffSlot::new(Arc::new(storage));
    let handed = slot.load(32).unwrap().unwrap();
    assert_eq!((handed.width(), handed.height()), (4, 3));
    assert_eq!(navigator.routes(), vec![Route::Analyzing]);
}
