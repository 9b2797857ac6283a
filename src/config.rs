// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, Facing};
use crate::constants::{
    CaptureQuality, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_PREVIEW_MAX_EDGE,
};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the config file inside the application config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which way the camera should face when the screen opens
    pub preferred_facing: Facing,
    /// Camera provider to use (V4L2 or still images)
    pub backend: CameraBackendType,
    /// Image files served as devices by the still image provider
    pub source_paths: Vec<PathBuf>,
    /// Requested capture width
    pub capture_width: u32,
    /// Requested capture height
    pub capture_height: u32,
    /// JPEG quality preset for captured frames
    pub capture_quality: CaptureQuality,
    /// Session storage namespace used for the handoff slot
    pub session_name: String,
    /// Longest edge of rendered previews
    pub preview_max_edge: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_facing: Facing::Rear, // Leaf scans use the back camera
            backend: CameraBackendType::default(),
            source_paths: Vec::new(),
            capture_width: DEFAULT_CAPTURE_WIDTH,
            capture_height: DEFAULT_CAPTURE_HEIGHT,
            capture_quality: CaptureQuality::default(),
            session_name: "default".to_string(),
            preview_max_edge: DEFAULT_PREVIEW_MAX_EDGE,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("leafscan").join(CONFIG_FILE_NAME))
    }

    /// Load the config, falling back to defaults when the file is missing or invalid
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Load the config from a specific file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(AppError::Config("capture resolution must be non-zero".into()));
        }
        if self.preview_max_edge == 0 {
            return Err(AppError::Config("preview_max_edge must be non-zero".into()));
        }
        if self.session_name.trim().is_empty() {
            return Err(AppError::Config("session_name must not be empty".into()));
        }
        Ok(())
    }
}
