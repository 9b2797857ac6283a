// SPDX-License-Identifier: GPL-3.0-only

//! Capture screen module
//!
//! This module contains the capture screen state machine, its message
//! handling and its terminal rendering.
//!
//! # Architecture
//!
//! - `state`: Screen state types (CaptureScreen, CaptureState, Message, Task)
//! - `handlers`: Operation handlers grouped by domain
//! - `update`: Message and intent dispatch
//! - `camera_preview`: Preview region, leaf guide and captions
//! - `controls`: Control buttons and key bindings
//! - `view`: Full screen layout
//!
//! # Flow
//!
//! Every operation returns a [`Task`]. The caller resolves it (spawning it on
//! the runtime or awaiting it) and feeds the resulting [`Message`] back into
//! [`CaptureScreen::update`], which may return a follow-up task.

pub mod camera_preview;
pub mod controls;
mod handlers;
mod state;
mod update;
pub mod view;

pub use controls::{ControlButton, ControlSet, Intent};
pub use state::{
    CaptureScreen, CaptureState, ChannelNavigator, FilePicker, Lifecycle, Message, Navigator,
    RfdFilePicker, Route, ScreenDependencies, ScreenOptions, Task,
};
pub use view::ScreenView;
