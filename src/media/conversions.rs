// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion for raw device buffers
//!
//! V4L2 devices hand us either packed YUYV or MJPEG buffers. Both are converted
//! to packed RGB24 before they become a [`CameraFrame`].

use crate::backends::camera::types::{CameraFrame, PixelFormat};

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Convert a packed YUYV 4:2:2 buffer into an RGB24 frame
///
/// Two pixels share one chroma pair: `Y0 U Y1 V`. Returns `None` when the buffer
/// is shorter than the frame geometry requires.
pub fn yuyv_to_frame(data: &[u8], width: u32, height: u32, stride: u32) -> Option<CameraFrame> {
    let stride = if stride == 0 { width * 2 } else { stride };
    if data.len() < (stride * height) as usize || width < 2 {
        return None;
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        let row = (y * stride) as usize;
        for x in 0..width {
            let base = row + ((x & !1) * 2) as usize;
            if base + 3 >= data.len() {
                rgb.extend_from_slice(&[0, 0, 0]);
                continue;
            }
            let luma = if x & 1 == 0 { data[base] } else { data[base + 2] };
            let (r, g, b) = yuv_to_rgb(luma, data[base + 1], data[base + 3]);
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    Some(CameraFrame::packed(width, height, PixelFormat::RGB24, rgb))
}

/// Decode an MJPEG buffer into an RGB24 frame
pub fn mjpeg_to_frame(data: &[u8]) -> Option<CameraFrame> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg).ok()?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Some(CameraFrame::packed(
        width,
        height,
        PixelFormat::RGB24,
        rgb.into_raw(),
    ))
}
