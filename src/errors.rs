// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture application

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture flow errors
    Capture(CaptureError),
    /// Camera backend errors outside the capture flow (enumeration, CLI)
    Camera(BackendError),
    /// Configuration errors
    Config(String),
    /// Session storage errors
    Storage(StorageError),
    /// Generic error with message
    Other(String),
}

/// Errors raised by capture screen operations
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Confirm was requested without a captured image
    NoImage,
    /// The screen has already been torn down
    Unmounted,
    /// Handoff storage failed
    Storage(StorageError),
}

/// Image decoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The file could not be read
    Io(String),
    /// The bytes are not in a supported image format
    UnsupportedFormat(String),
    /// The bytes look like an image but failed to decode
    Malformed(String),
    /// A handoff value is not a base64 image data URL
    InvalidDataUrl(String),
}

/// Session storage errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying filesystem error
    Io(String),
    /// Stored value is not valid
    Corrupt(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoImage => write!(f, "No captured image to confirm"),
            CaptureError::Unmounted => write!(f, "Capture screen is no longer active"),
            CaptureError::Storage(e) => write!(f, "Handoff failed: {}", e),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Io(msg) => write!(f, "Could not read file: {}", msg),
            DecodeError::UnsupportedFormat(msg) => write!(f, "Unsupported image format: {}", msg),
            DecodeError::Malformed(msg) => write!(f, "Malformed image: {}", msg),
            DecodeError::InvalidDataUrl(msg) => write!(f, "Invalid image data URL: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "I/O error: {}", msg),
            StorageError::Corrupt(msg) => write!(f, "Corrupt value: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for StorageError {}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<StorageError> for CaptureError {
    fn from(err: StorageError) -> Self {
        CaptureError::Storage(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io(err.to_string())
    }
}
