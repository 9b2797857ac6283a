// SPDX-License-Identifier: GPL-3.0-only

//! Capture controls module
//!
//! Decides which buttons are shown for a capture state and maps key presses
//! to user intents. The controls never touch the screen directly; they only
//! emit [`Intent`]s for [`CaptureScreen::handle_intent`].
//!
//! [`CaptureScreen::handle_intent`]: crate::app::CaptureScreen::handle_intent

pub mod widget;

pub use widget::ControlsBar;

use crate::app::state::CaptureState;
use crossterm::event::KeyCode;

/// A user action on the capture screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Capture,
    SwitchDevice,
    Upload,
    Retake,
    Confirm,
    Back,
}

const CAPTURE_KEYS: &[KeyCode] = &[KeyCode::Char('c'), KeyCode::Char(' ')];
const FLIP_KEYS: &[KeyCode] = &[KeyCode::Char('f')];
const UPLOAD_KEYS: &[KeyCode] = &[KeyCode::Char('u')];
const GALLERY_KEYS: &[KeyCode] = &[KeyCode::Char('g')];
const RETAKE_KEYS: &[KeyCode] = &[KeyCode::Char('r')];
const CONFIRM_KEYS: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char('y')];

/// One button of the control bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlButton {
    pub intent: Intent,
    pub label: &'static str,
    pub keys: &'static [KeyCode],
    pub enabled: bool,
    /// Rendered with emphasis (the center shutter, confirm)
    pub primary: bool,
}

impl ControlButton {
    const fn new(intent: Intent, label: &'static str, keys: &'static [KeyCode]) -> Self {
        Self {
            intent,
            label,
            keys,
            enabled: true,
            primary: false,
        }
    }

    const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    const fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Whether this button reacts to a key press
    pub fn matches(&self, key: KeyCode) -> bool {
        self.enabled && self.keys.contains(&normalize_key(key))
    }

    /// Key hint such as `c/space`
    pub fn hint(&self) -> String {
        self.keys
            .iter()
            .map(|key| key_label(*key))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The buttons shown for a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSet {
    /// Live view, error and idle layout
    Live {
        left: ControlButton,
        center: ControlButton,
        right: ControlButton,
    },
    /// Review layout for a captured image
    Review {
        retake: ControlButton,
        confirm: ControlButton,
    },
}

impl ControlSet {
    pub fn for_state(state: &CaptureState, multiple_devices: bool) -> Self {
        let streaming = state.is_streaming();
        match state {
            CaptureState::Captured(_) => ControlSet::Review {
                retake: ControlButton::new(Intent::Retake, "Retake", RETAKE_KEYS),
                confirm: ControlButton::new(Intent::Confirm, "Confirm", CONFIRM_KEYS).primary(),
            },
            _ => {
                let left = if multiple_devices {
                    ControlButton::new(Intent::SwitchDevice, "Flip", FLIP_KEYS).enabled(streaming)
                } else {
                    ControlButton::new(Intent::Upload, "Upload", UPLOAD_KEYS).enabled(streaming)
                };
                // An error always offers a way back to the camera
                let center = if state.error_message().is_some() {
                    ControlButton::new(Intent::Retake, "Retry", RETAKE_KEYS).primary()
                } else {
                    ControlButton::new(Intent::Capture, "Capture", CAPTURE_KEYS)
                        .enabled(streaming)
                        .primary()
                };
                // Uploads replace a live stream, so they need one
                let right =
                    ControlButton::new(Intent::Upload, "Gallery", GALLERY_KEYS).enabled(streaming);
                ControlSet::Live {
                    left,
                    center,
                    right,
                }
            }
        }
    }

    /// Buttons in display order
    pub fn buttons(&self) -> Vec<ControlButton> {
        match *self {
            ControlSet::Live {
                left,
                center,
                right,
            } => vec![left, center, right],
            ControlSet::Review { retake, confirm } => vec![retake, confirm],
        }
    }

    /// Intent bound to a key, if an enabled button claims it
    pub fn intent_for_key(&self, key: KeyCode) -> Option<Intent> {
        self.buttons()
            .into_iter()
            .find(|button| button.matches(key))
            .map(|button| button.intent)
    }
}

fn normalize_key(key: KeyCode) -> KeyCode {
    match key {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

fn key_label(key: KeyCode) -> String {
    match key {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}
