// SPDX-License-Identifier: GPL-3.0-only

//! Main view rendering
//!
//! Lays the capture screen out as header, preview, controls and status bar.

use crate::app::camera_preview::{self, CaptureView};
use crate::app::controls::{ControlSet, ControlsBar};
use crate::app::state::{CaptureScreen, CaptureState};
use crate::backends::camera::CameraFrame;
use crate::constants::ui;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Full-screen widget for the capture screen
pub struct ScreenView<'a> {
    screen: &'a CaptureScreen,
    live: Option<&'a CameraFrame>,
}

impl<'a> ScreenView<'a> {
    /// `live` is the latest frame, fetched by the caller once per redraw
    pub fn new(screen: &'a CaptureScreen, live: Option<&'a CameraFrame>) -> Self {
        Self { screen, live }
    }
}

impl Widget for ScreenView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [header, body, controls, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(area);

        let title_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        let mut spans = vec![
            Span::styled("← [q] ", Style::default().fg(Color::Gray)),
            Span::styled(ui::TITLE, title_style),
        ];
        if let Some(device) = self.screen.device_name() {
            spans.push(Span::styled(format!("  {}", device), Style::default().fg(Color::DarkGray)));
        }
        Line::from(spans).render(header, buf);

        CaptureView::new(camera_preview::layers(self.screen.state(), self.live)).render(body, buf);

        let set = ControlSet::for_state(self.screen.state(), self.screen.device_capability());
        ControlsBar::new(&set).render(controls, buf);

        let message = status_message(self.screen.state(), self.screen.notice(), &set);
        StatusBar { message: &message }.render(status, buf);
    }
}

/// Notice if there is one, else the key help; a capture is stamped with its time
fn status_message(state: &CaptureState, notice: Option<&str>, set: &ControlSet) -> String {
    match (notice, state.captured_image()) {
        (Some(notice), _) => notice.to_string(),
        (None, Some(image)) => format!(
            "Captured {} | {}",
            image.captured_at().format("%H:%M:%S"),
            key_help(set)
        ),
        (None, None) => key_help(set),
    }
}

fn key_help(set: &ControlSet) -> String {
    let mut parts: Vec<String> = set
        .buttons()
        .iter()
        .filter(|b| b.enabled)
        .map(|b| format!("'{}' {}", b.hint(), b.label.to_lowercase()))
        .collect();
    parts.push("'q' back".to_string());
    parts.join(" | ")
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(Color::White).bg(Color::DarkGray);

        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, style);
    }
}
