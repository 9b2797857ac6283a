// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the capture screen
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a snapshot without the interactive screen
//! - Inspecting the image currently handed off to analysis

use leafscan::app::{
    CaptureScreen, CaptureState, ChannelNavigator, RfdFilePicker, ScreenDependencies,
    ScreenOptions,
};
use leafscan::backends::camera::{ProviderOptions, get_provider};
use leafscan::config::Config;
use leafscan::constants::timing;
use leafscan::errors::AppError;
use leafscan::storage::{FileSessionStorage, HandoffSlot};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use tracing::{debug, info};

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let provider = get_provider(config.backend, ProviderOptions::from_config(config));
    let cameras = provider.devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Facing: {}", camera.facing);
        println!("      Path:   {}", camera.path);
        println!();
    }

    Ok(())
}

/// Open the camera, take one still and hand it off, without a terminal UI
pub fn take_snapshot(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(snapshot(config))
}

async fn snapshot(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (route_tx, route_rx) = mpsc::channel();
    let storage = FileSessionStorage::for_session(&config.session_name);
    let deps = ScreenDependencies {
        provider: get_provider(config.backend, ProviderOptions::from_config(config)),
        handoff: HandoffSlot::new(Arc::new(storage)),
        navigator: Arc::new(ChannelNavigator::new(route_tx)),
        picker: Arc::new(RfdFilePicker),
    };
    let mut screen = CaptureScreen::new(deps, ScreenOptions::from_config(config));

    let task = screen.mount();
    screen.settle(task).await;

    if let CaptureState::Error(message) = screen.state() {
        return Err(AppError::Other(message.clone()).into());
    }
    if let Some(device) = screen.device_name() {
        println!("Using camera: {}", device);
    }

    // The first frames can take a moment to arrive after the stream opens
    for attempt in 1..=timing::SNAP_MAX_ATTEMPTS {
        let task = screen.capture();
        screen.settle(task).await;
        if screen.state().is_captured() {
            debug!(attempt, "Frame captured");
            break;
        }
        tokio::time::sleep(timing::SNAP_RETRY_INTERVAL).await;
    }

    let Some(image) = screen.state().captured_image() else {
        screen.unmount();
        return Err("Camera produced no frame".into());
    };
    println!(
        "Captured {}x{} {} at {} ({} quality, {} bytes)",
        image.width(),
        image.height(),
        image.encoding().mime(),
        image.captured_at().format("%H:%M:%S"),
        config.capture_quality.display_name(),
        image.bytes().len()
    );

    screen.confirm()?;
    if let Ok(route) = route_rx.try_recv() {
        info!(route = route.path(), "Snapshot handed off");
        println!("Handed off to {}", route.path());
    }

    Ok(())
}

/// Print the handed-off image and optionally write its bytes to a file
pub fn show_handoff(
    config: &Config,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = FileSessionStorage::for_session(&config.session_name);
    let slot = HandoffSlot::new(Arc::new(storage));

    let Some(image) = slot.load(config.preview_max_edge)? else {
        println!("No image has been handed off in session '{}'.", config.session_name);
        return Ok(());
    };

    println!("Handed-off image:");
    println!("  Size:     {}x{}", image.width(), image.height());
    println!("  Encoding: {}", image.encoding().mime());
    println!("  Bytes:    {}", image.bytes().len());

    if let Some(path) = output {
        std::fs::write(&path, image.bytes())?;
        println!("  Written:  {}", path.display());
    }

    Ok(())
}
