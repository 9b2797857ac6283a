// SPDX-License-Identifier: GPL-3.0-only

//! Media utilities for captured and uploaded images
//!
//! - [`image`]: the encoded [`Image`] value shared by capture and upload
//! - [`conversions`]: raw device buffer to RGB conversion

pub mod conversions;
pub mod image;

pub use self::image::{Image, ImageEncoding, ImageSource};
