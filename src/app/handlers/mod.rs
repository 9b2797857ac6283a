// SPDX-License-Identifier: GPL-3.0-only

//! Message handler modules
//!
//! Handlers are split by functional domain: stream lifecycle in `camera`,
//! stills and handoff in `capture`.

pub mod camera;
pub mod capture;
