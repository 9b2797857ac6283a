// SPDX-License-Identifier: GPL-3.0-only

//! Control bar widget

use super::{ControlButton, ControlSet};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

/// Renders a [`ControlSet`] as a row of bordered buttons
pub struct ControlsBar<'a> {
    set: &'a ControlSet,
}

impl<'a> ControlsBar<'a> {
    pub fn new(set: &'a ControlSet) -> Self {
        Self { set }
    }
}

impl Widget for ControlsBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let buttons = self.set.buttons();
        let count = buttons.len() as u32;
        let columns = Layout::horizontal(buttons.iter().map(|_| Constraint::Ratio(1, count)))
            .split(area);

        for (button, column) in buttons.iter().zip(columns.iter()) {
            render_button(button, *column, buf);
        }
    }
}

fn render_button(button: &ControlButton, area: Rect, buf: &mut Buffer) {
    let style = if !button.enabled {
        Style::default().fg(Color::DarkGray)
    } else if button.primary {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let block = Block::bordered().border_style(style);
    let inner = block.inner(area);
    block.render(area, buf);

    Line::from(vec![
        Span::styled(format!("[{}] ", button.hint()), style.remove_modifier(Modifier::BOLD)),
        Span::styled(button.label, style),
    ])
    .centered()
    .render(inner, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::CaptureState;

    fn rendered(set: &ControlSet, width: u16) -> String {
        let area = Rect::new(0, 0, width, 3);
        let mut buf = Buffer::empty(area);
        ControlsBar::new(set).render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_live_bar_lists_three_buttons() {
        let set = ControlSet::for_state(&CaptureState::Streaming, true);
        let text = rendered(&set, 72);
        assert!(text.contains("Flip"));
        assert!(text.contains("[c/space] Capture"));
        assert!(text.contains("Gallery"));
    }

    #[test]
    fn test_error_bar_shows_retry() {
        let set = ControlSet::for_state(&CaptureState::Error("busy".into()), false);
        let text = rendered(&set, 72);
        assert!(text.contains("Retry"));
        assert!(!text.contains("Capture"));
    }
}
