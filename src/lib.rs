// SPDX-License-Identifier: GPL-3.0-only

//! Leafscan - the leaf capture screen of a crop disease scanner
//!
//! This library provides the capture screen: it opens a camera stream,
//! lets the user take or upload a leaf photo, and hands the confirmed image
//! to the analysis screen through session-scoped storage.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Capture screen state machine, controls and rendering
//! - [`backends`]: Camera session providers (V4L2, still images)
//! - [`media`]: Encoded images, data URLs and pixel conversions
//! - [`storage`]: Session storage and the handoff slot
//! - [`config`]: User configuration handling
//! - [`terminal`]: Interactive terminal front end

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{CaptureScreen, CaptureState, Intent, Message, Route};
pub use config::Config;
pub use constants::CaptureQuality;
