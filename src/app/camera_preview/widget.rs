// SPDX-License-Identifier: GPL-3.0-only

//! Preview area widget
//!
//! Renders pixels with Unicode half-block characters: each terminal cell
//! shows two vertical pixels, the upper one as foreground and the lower one
//! as background.

use super::{Region, ViewLayers};
use crate::constants::ui;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

/// Leaf outline in a 200x240 box: four cubic segments
const LEAF_OUTLINE: [[(f32, f32); 4]; 4] = [
    [(100.0, 20.0), (60.0, 40.0), (30.0, 80.0), (30.0, 140.0)],
    [(30.0, 140.0), (30.0, 200.0), (70.0, 220.0), (100.0, 220.0)],
    [(100.0, 220.0), (130.0, 220.0), (170.0, 200.0), (170.0, 140.0)],
    [(170.0, 140.0), (170.0, 80.0), (140.0, 40.0), (100.0, 20.0)],
];

/// Midrib and side veins in the same box
const LEAF_VEINS: [((f32, f32), (f32, f32)); 9] = [
    ((100.0, 40.0), (100.0, 200.0)),
    ((100.0, 60.0), (60.0, 90.0)),
    ((100.0, 90.0), (50.0, 130.0)),
    ((100.0, 120.0), (55.0, 160.0)),
    ((100.0, 150.0), (65.0, 185.0)),
    ((100.0, 60.0), (140.0, 90.0)),
    ((100.0, 90.0), (150.0, 130.0)),
    ((100.0, 120.0), (145.0, 160.0)),
    ((100.0, 150.0), (135.0, 185.0)),
];

const GUIDE_BOX: (f32, f32) = (200.0, 240.0);
const GUIDE_COLOR: Color = Color::LightGreen;
const VEIN_COLOR: Color = Color::Green;

/// The capture screen's preview area
pub struct CaptureView<'a> {
    layers: ViewLayers<'a>,
}

impl<'a> CaptureView<'a> {
    pub fn new(layers: ViewLayers<'a>) -> Self {
        Self { layers }
    }
}

impl Widget for CaptureView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        match self.layers.region {
            Region::Placeholder | Region::Live(None) => {
                render_centered(ui::STARTING_CAMERA, area, area.height / 2, Style::default(), buf);
            }
            Region::Live(Some(frame)) => {
                render_pixels(frame.width, frame.height, |x, y| frame.sample_rgb(x, y), area, buf);
            }
            Region::Still(image) => {
                let preview = image.preview();
                render_pixels(
                    preview.width(),
                    preview.height(),
                    |x, y| {
                        let p = preview.get_pixel(x.min(preview.width() - 1), y.min(preview.height() - 1));
                        (p[0], p[1], p[2])
                    },
                    area,
                    buf,
                );
            }
            Region::Error(message) => {
                let middle = area.height / 2;
                render_centered(
                    message,
                    area,
                    middle.saturating_sub(1),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    buf,
                );
                render_centered(
                    ui::ERROR_HINT,
                    area,
                    middle + 1,
                    Style::default().fg(Color::DarkGray),
                    buf,
                );
            }
        }

        if self.layers.guide {
            render_guide(guide_area(area), buf);
        }

        if let Some([first, second]) = self.layers.captions {
            let bottom = area.height.saturating_sub(3);
            render_centered(first, area, bottom, Style::default().fg(Color::White), buf);
            render_centered(second, area, bottom + 1, Style::default().fg(Color::Gray), buf);
        }
    }
}

/// Fit an image into the area keeping its aspect ratio and draw it with half blocks
fn render_pixels<F>(width: u32, height: u32, sample: F, area: Rect, buf: &mut Buffer)
where
    F: Fn(u32, u32) -> (u8, u8, u8),
{
    if width == 0 || height == 0 {
        return;
    }

    let aspect = width as f64 / height as f64;
    let term_width = area.width as f64;
    let term_height = (area.height * 2) as f64;

    let (display_width, display_height) = if term_width / term_height > aspect {
        // Area is wider - fit to height
        let w = term_height * aspect;
        (w as u16, (term_height / 2.0) as u16)
    } else {
        // Area is taller - fit to width
        let h = term_width / aspect;
        (term_width as u16, (h / 2.0) as u16)
    };
    if display_width == 0 || display_height == 0 {
        return;
    }

    let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
    let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;
    let x_scale = width as f64 / display_width as f64;
    let y_scale = height as f64 / (display_height * 2) as f64;

    for ty in 0..display_height {
        for tx in 0..display_width {
            let src_x = (tx as f64 * x_scale) as u32;
            let src_top = (ty as f64 * 2.0 * y_scale) as u32;
            let src_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

            let (r, g, b) = sample(src_x, src_top);
            let top = Color::Rgb(r, g, b);
            let (r, g, b) = sample(src_x, src_bottom);
            let bottom = Color::Rgb(r, g, b);

            if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                cell.set_char('▀');
                cell.set_fg(top);
                cell.set_bg(bottom);
            }
        }
    }
}

/// Box the guide occupies: the 200x240 shape scaled into the middle of the area
///
/// Terminal cells are about twice as tall as wide, so the width is doubled.
pub(crate) fn guide_area(area: Rect) -> Rect {
    let max_height = (area.height as f32 * 0.75).max(1.0);
    let max_width = (area.width as f32 * 0.8).max(1.0);
    let height_for_width = max_width / 2.0 * GUIDE_BOX.1 / GUIDE_BOX.0;

    let (width, height) = if height_for_width > max_height {
        (max_height * 2.0 * GUIDE_BOX.0 / GUIDE_BOX.1, max_height)
    } else {
        (max_width, height_for_width)
    };
    let (width, height) = (width.round().max(2.0) as u16, height.round().max(2.0) as u16);
    let width = width.min(area.width);
    let height = height.min(area.height);

    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_guide(guide: Rect, buf: &mut Buffer) {
    let to_cell = |(x, y): (f32, f32)| -> (u16, u16) {
        let cx = x / GUIDE_BOX.0 * (guide.width.saturating_sub(1)) as f32;
        let cy = y / GUIDE_BOX.1 * (guide.height.saturating_sub(1)) as f32;
        (guide.x + cx.round() as u16, guide.y + cy.round() as u16)
    };

    for (start, end) in LEAF_VEINS {
        for step in 0..=24 {
            let t = step as f32 / 24.0;
            let point = (start.0 + (end.0 - start.0) * t, start.1 + (end.1 - start.1) * t);
            plot(buf, to_cell(point), '·', VEIN_COLOR);
        }
    }

    for segment in LEAF_OUTLINE {
        for step in 0..=48 {
            plot(buf, to_cell(cubic(segment, step as f32 / 48.0)), '•', GUIDE_COLOR);
        }
    }

    let right = guide.x + guide.width.saturating_sub(1);
    let bottom = guide.y + guide.height.saturating_sub(1);
    plot(buf, (guide.x, guide.y), '┏', GUIDE_COLOR);
    plot(buf, (right, guide.y), '┓', GUIDE_COLOR);
    plot(buf, (guide.x, bottom), '┗', GUIDE_COLOR);
    plot(buf, (right, bottom), '┛', GUIDE_COLOR);
}

/// Point on a cubic Bezier segment
fn cubic(points: [(f32, f32); 4], t: f32) -> (f32, f32) {
    let u = 1.0 - t;
    let w = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
    points
        .iter()
        .zip(w)
        .fold((0.0, 0.0), |(x, y), (p, w)| (x + p.0 * w, y + p.1 * w))
}

/// Overlay a glyph, keeping the cell background
fn plot(buf: &mut Buffer, (x, y): (u16, u16), symbol: char, color: Color) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char(symbol);
        cell.set_fg(color);
    }
}

fn render_centered(text: &str, area: Rect, row: u16, style: Style, buf: &mut Buffer) {
    if row >= area.height {
        return;
    }
    let width = text.chars().count().min(area.width as usize);
    let x = area.x + (area.width - width as u16) / 2;
    let line: String = text.chars().take(width).collect();
    buf.set_string(x, area.y + row, line, style);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::camera_preview::layers;
    use crate::app::state::CaptureState;
    use crate::backends::camera::{CameraFrame, PixelFormat};

    fn render(state: &CaptureState, frame: Option<&CameraFrame>) -> Buffer {
        let area = Rect::new(0, 0, 60, 24);
        let mut buf = Buffer::empty(area);
        CaptureView::new(layers(state, frame)).render(area, &mut buf);
        buf
    }

    fn text(buf: &Buffer) -> String {
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_idle_shows_placeholder_only() {
        let buf = render(&CaptureState::Idle, None);
        let text = text(&buf);
        assert!(text.contains(ui::STARTING_CAMERA));
        assert!(!text.contains('┏'));
    }

    #[test]
    fn test_streaming_draws_frame_guide_and_captions() {
        let frame = CameraFrame::packed(4, 4, PixelFormat::RGB24, vec![200; 48]);
        let buf = render(&CaptureState::Streaming, Some(&frame));
        let text = text(&buf);
        assert!(text.contains('▀'));
        assert!(text.contains('┏'));
        assert!(text.contains('•'));
        assert!(text.contains(ui::CAPTION_POSITION));
        assert!(text.contains(ui::CAPTION_LIGHTING));
    }

    #[test]
    fn test_error_shows_message_and_hint() {
        let buf = render(&CaptureState::Error("Camera permission denied".into()), None);
        let text = text(&buf);
        assert!(text.contains("Camera permission denied"));
        assert!(text.contains(ui::ERROR_HINT));
        assert!(!text.contains('•'));
    }

    #[test]
    fn test_guide_area_is_centered_and_inside() {
        let area = Rect::new(0, 0, 80, 24);
        let guide = guide_area(area);
        assert!(guide.width <= area.width && guide.height <= area.height);
        assert_eq!(guide.y, (area.height - guide.height) / 2);
        assert!(guide.width > guide.height);
    }

    #[test]
    fn test_cubic_endpoints() {
        let segment = LEAF_OUTLINE[0];
        assert_eq!(cubic(segment, 0.0), segment[0]);
        let end = cubic(segment, 1.0);
        assert!((end.0 - segment[3].0).abs() < 1e-3 && (end.1 - segment[3].1).abs() < 1e-3);
    }
}
