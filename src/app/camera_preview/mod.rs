// SPDX-License-Identifier: GPL-3.0-only

//! Camera preview module
//!
//! Maps the capture state to what the preview area shows. The main region is
//! a single [`Region`] value, so the live feed and a captured still can never
//! be drawn at the same time.

pub mod widget;

pub use widget::CaptureView;

use crate::app::state::CaptureState;
use crate::backends::camera::CameraFrame;
use crate::constants::ui;
use crate::media::Image;

/// Main content of the preview area
#[derive(Debug, Clone, Copy)]
pub enum Region<'a> {
    /// Camera is starting
    Placeholder,
    /// Live feed; `None` until the first frame arrives
    Live(Option<&'a CameraFrame>),
    /// Captured or uploaded still
    Still(&'a Image),
    /// Acquisition error message
    Error(&'a str),
}

/// Everything drawn in the preview area for one state
#[derive(Debug, Clone, Copy)]
pub struct ViewLayers<'a> {
    pub region: Region<'a>,
    /// Leaf outline guide with corner markers
    pub guide: bool,
    /// Framing instructions under the guide
    pub captions: Option<[&'static str; 2]>,
}

/// Compute the layers for a capture state and the latest live frame
pub fn layers<'a>(state: &'a CaptureState, live: Option<&'a CameraFrame>) -> ViewLayers<'a> {
    match state {
        CaptureState::Idle => ViewLayers {
            region: Region::Placeholder,
            guide: false,
            captions: None,
        },
        CaptureState::Streaming => ViewLayers {
            region: Region::Live(live),
            guide: true,
            captions: Some([ui::CAPTION_POSITION, ui::CAPTION_LIGHTING]),
        },
        CaptureState::Captured(image) => ViewLayers {
            region: Region::Still(image),
            guide: true,
            captions: None,
        },
        CaptureState::Error(message) => ViewLayers {
            region: Region::Error(message),
            guide: false,
            captions: None,
        },
    }
}
