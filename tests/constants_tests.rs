// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use leafscan::constants::{ANALYSIS_ROUTE, CaptureQuality, HANDOFF_KEY};

const PRESETS: [CaptureQuality; 4] = [
    CaptureQuality::Low,
    CaptureQuality::Medium,
    CaptureQuality::High,
    CaptureQuality::Maximum,
];

#[test]
fn test_capture_quality_values() {
    assert_eq!(CaptureQuality::default(), CaptureQuality::High);
}

#[test]
fn test_capture_quality_ordering() {
    // Test that presets are ordered from lowest to highest quality
    let mut prev_quality = 0u8;
    for preset in PRESETS {
        let quality = preset.jpeg_quality();
        assert!(
            quality > prev_quality,
            "Presets should be ordered from lowest to highest"
        );
        assert!(quality <= 100);
        prev_quality = quality;
    }
}

#[test]
fn test_capture_quality_display_names() {
    let names: Vec<_> = PRESETS.iter().map(|p| p.display_name()).collect();
    assert_eq!(names, ["Low", "Medium", "High", "Maximum"]);
}

#[test]
fn test_handoff_contract() {
    // The analysis screen reads this key and listens on this route
    assert_eq!(HANDOFF_KEY, "capturedImage");
    assert_eq!(ANALYSIS_ROUTE, "/analyzing");
}
