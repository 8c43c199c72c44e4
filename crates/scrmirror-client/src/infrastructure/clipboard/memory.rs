//! In-memory clipboard.

use std::sync::{Mutex, MutexGuard};

use crate::application::sync_clipboard::{ClipboardError, PlatformClipboard};

#[derive(Debug, Default)]
struct Inner {
    text: Option<String>,
    set_count: usize,
}

/// A process-local clipboard that counts writes.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    inner: Mutex<Inner>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                text: Some(text.into()),
                set_count: 0,
            }),
        }
    }

    pub fn text(&self) -> Option<String> {
        self.lock().text.clone()
    }

    /// Number of `set_text` calls so far.
    pub fn set_count(&self) -> usize {
        self.lock().set_count
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlatformClipboard for MemoryClipboard {
    fn get_text(&self) -> Result<Option<String>, ClipboardError> {
        Ok(self.text())
    }

    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut inner = self.lock();
        inner.text = Some(text.to_string());
        inner.set_count += 1;
        Ok(())
    }
}
