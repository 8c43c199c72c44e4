//! Clipboard synchronisation between the device and the local desktop.
//!
//! - Device → host: a [`DeviceMessage::Clipboard`] replaces the local
//!   clipboard, unless it already holds the same text (this keeps the two
//!   sides from bouncing the same value back and forth).
//! - Host → device: [`ClipboardSync::outgoing_set_clipboard`] builds the
//!   `SetClipboard` command the input mapper pushes to the control channel.
//!
//! The OS clipboard is reached through [`PlatformClipboard`], injected at
//! construction time.

use std::sync::Arc;

use scrmirror_core::protocol::messages::{ControlMessage, DeviceMessage};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("platform clipboard error: {0}")]
    Platform(String),
    #[error("clipboard unavailable")]
    Unavailable,
}

/// Access to the local desktop clipboard.
#[cfg_attr(test, mockall::automock)]
pub trait PlatformClipboard: Send + Sync {
    /// Returns the current clipboard text, or `None` when it holds no text.
    fn get_text(&self) -> Result<Option<String>, ClipboardError>;

    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// What applying a device message did to the local clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOutcome {
    Updated,
    Unchanged,
}

#[derive(Clone)]
pub struct ClipboardSync {
    clipboard: Arc<dyn PlatformClipboard>,
}

impl ClipboardSync {
    pub fn new(clipboard: Arc<dyn PlatformClipboard>) -> Self {
        Self { clipboard }
    }

    /// Applies a message received from the device.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError`] if writing the local clipboard fails. A
    /// failure to *read* the current value is logged and treated as "different".
    pub fn apply(&self, msg: &DeviceMessage) -> Result<ClipboardOutcome, ClipboardError> {
        match msg {
            DeviceMessage::Clipboard { text } => {
                match self.clipboard.get_text() {
                    Ok(Some(current)) if current == *text => {
                        debug!("device clipboard matches local clipboard");
                        return Ok(ClipboardOutcome::Unchanged);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("could not read local clipboard: {e}"),
                }
                info!(len = text.len(), "device clipboard changed, updating local clipboard");
                self.clipboard.set_text(text)?;
                Ok(ClipboardOutcome::Updated)
            }
        }
    }

    /// Builds a `SetClipboard` command carrying the local clipboard text.
    ///
    /// Returns `Ok(None)` when the local clipboard holds no text.
    pub fn outgoing_set_clipboard(
        &self,
        paste: bool,
    ) -> Result<Option<ControlMessage>, ClipboardError> {
        Ok(self
            .clipboard
            .get_text()?
            .map(|text| ControlMessage::SetClipboard { text, paste }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
