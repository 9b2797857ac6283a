// SPDX-License-Identifier: GPL-3.0-only

//! Session-scoped storage and the image handoff slot
//!
//! Session storage is a small key/value store whose lifetime matches the
//! user's login session. The capture screen uses a single key of it to hand the
//! confirmed image to the analysis screen.

use crate::constants::HANDOFF_KEY;
use crate::errors::StorageError;
use crate::media::{Image, ImageSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Key/value storage shared between screens
pub trait SessionStorage: Send + Sync {
    /// Store a value, overwriting any previous value for the key
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read a value without removing it
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
}

/// In-process session storage
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::Io("storage lock poisoned".into()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StorageError::Io("storage lock poisoned".into()))?;
        Ok(items.get(key).cloned())
    }
}

/// Session storage backed by one file per key
///
/// Lives under the XDG runtime directory, which is wiped when the user logs
/// out, so values never outlive the session.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    /// Storage rooted at an explicit directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage for a named session in the runtime directory
    pub fn for_session(session_name: &str) -> Self {
        let base = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("leafscan").join(sanitize_key(session_name)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(sanitize_key(key))
    }
}

impl SessionStorage for FileSessionStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        // Write then rename so a reader never sees a partial value
        let tmp = self
            .dir
            .join(format!(".{}.{}", sanitize_key(key), uuid::Uuid::new_v4()));
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(path = %path.display(), size = value.len(), "Stored session item");
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The handoff key between the capture screen and the analysis screen
#[derive(Clone)]
pub struct HandoffSlot {
    storage: Arc<dyn SessionStorage>,
}

impl HandoffSlot {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Overwrite the slot with an image
    pub fn store(&self, image: &Image) -> Result<(), StorageError> {
        self.storage.set_item(HANDOFF_KEY, &image.to_data_url())?;
        info!(
            width = image.width(),
            height = image.height(),
            encoding = image.encoding().mime(),
            "Image handed off"
        );
        Ok(())
    }

    /// Read the most recently confirmed image; the slot is left in place
    pub fn load(&self, preview_max_edge: u32) -> Result<Option<Image>, StorageError> {
        let Some(url) = self.storage.get_item(HANDOFF_KEY)? else {
            return Ok(None);
        };
        Image::from_data_url(&url, ImageSource::Handoff, preview_max_edge)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(e.to_string()))
    }
}

impl std::fmt::Debug for HandoffSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandoffSlot").field("key", &HANDOFF_KEY).finish()
    }
}
