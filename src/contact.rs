//! "Copy email" contact button
//!
//! Hovering expands the button to reveal the address, clicking (or pressing
//! Enter/Space) while expanded copies it, and the button reports "COPIED"
//! until a reset deadline passes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error};
use serde::Serialize;

use crate::platform::Clipboard;
use crate::{Error, Result};

const COMPACT_WIDTH_PX: u32 = 90;
const EXPANDED_WIDTH_PX: u32 = 290;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactState {
    Collapsed,
    Expanded,
    Copied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContactLabel {
    #[serde(rename = "CONTACT")]
    Contact,
    #[serde(rename = "COPY")]
    Copy,
    #[serde(rename = "COPIED")]
    Copied,
}

impl ContactLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactLabel::Contact => "CONTACT",
            ContactLabel::Copy => "COPY",
            ContactLabel::Copied => "COPIED",
        }
    }
}

pub struct ContactButton {
    id: String,
    email: String,
    state: ContactState,
    reset_at: Option<Instant>,
    reset_after: Duration,
    clipboard: Arc<dyn Clipboard>,
    fallback: Option<Arc<dyn Clipboard>>,
}

impl ContactButton {
    /// Build a button for the address found in `data-email`
    pub fn new(
        id: &str,
        email: Option<&str>,
        clipboard: Arc<dyn Clipboard>,
        reset_after: Duration,
    ) -> Result<Self> {
        let email = email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| Error::MissingEmail(id.to_string()))?;
        Ok(ContactButton {
            id: id.to_string(),
            email: email.trim().to_string(),
            state: ContactState::Collapsed,
            reset_at: None,
            reset_after,
            clipboard,
            fallback: None,
        })
    }

    /// Clipboard tried when the primary one refuses the write
    pub fn with_fallback(mut self, fallback: Arc<dyn Clipboard>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn state(&self) -> ContactState {
        self.state
    }

    pub fn label(&self) -> ContactLabel {
        match self.state {
            ContactState::Collapsed => ContactLabel::Contact,
            ContactState::Expanded => ContactLabel::Copy,
            ContactState::Copied => ContactLabel::Copied,
        }
    }

    /// Whether the label is drawn in the brand color
    pub fn highlighted(&self) -> bool {
        self.state != ContactState::Collapsed
    }

    pub fn aria_label(&self) -> &'static str {
        match self.state {
            ContactState::Copied => "Email copied to clipboard",
            _ => "Copy email",
        }
    }

    pub fn width_px(&self) -> u32 {
        match self.state {
            ContactState::Collapsed => COMPACT_WIDTH_PX,
            _ => EXPANDED_WIDTH_PX,
        }
    }

    pub fn hover_enter(&mut self) {
        if self.state != ContactState::Copied {
            self.state = ContactState::Expanded;
        }
    }

    pub fn hover_leave(&mut self) {
        if self.state != ContactState::Copied {
            self.state = ContactState::Collapsed;
        }
    }

    /// Copy the address if expanded. Returns whether a copy happened.
    pub fn click(&mut self, now: Instant) -> bool {
        if self.state != ContactState::Expanded {
            return false;
        }
        if let Err(e) = self.clipboard.write_text(&self.email) {
            debug!("{}: clipboard write failed, trying fallback: {}", self.id, e);
            let copied = match &self.fallback {
                Some(fallback) => fallback.write_text(&self.email),
                None => Err(e),
            };
            if let Err(e) = copied {
                error!("{}: failed to copy email: {}", self.id, e);
                return false;
            }
        }
        self.state = ContactState::Copied;
        self.reset_at = Some(now + self.reset_after);
        true
    }

    /// Keyboard activation; Enter and Space act like a click
    pub fn key(&mut self, key: &str, now: Instant) -> bool {
        match key {
            "Enter" | " " => self.click(now),
            _ => false,
        }
    }

    /// Advance time; leaves the copied state once the deadline has passed
    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.reset_at {
            if now >= deadline {
                self.reset_at = None;
                self.state = ContactState::Collapsed;
            }
        }
    }
}
