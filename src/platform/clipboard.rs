//! Clipboard access for the contact button

use std::sync::{Mutex, PoisonError};

use crate::PlatformError;

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), PlatformError>;
}

/// In-memory clipboard; can be told to refuse writes
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    refuse: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        MemoryClipboard {
            contents: Mutex::new(None),
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        MemoryClipboard {
            contents: Mutex::new(None),
            refuse: true,
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        if self.refuse {
            return Err(PlatformError::Clipboard("write permission denied".into()));
        }
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}
