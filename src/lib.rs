//! sitefx
//!
//! Headless controllers for the enhancement scripts of a marketing site: lazy
//! background video players, a ratio-aware CMS image grid, pixelated image
//! reveals, service tag styling and a copy-email contact button.
//!
//! Every browser collaborator (container element, video element, adaptive
//! streaming client, intersection observer, clipboard) sits behind a trait in
//! [`platform`], so all behavior runs without a browser. In-memory
//! implementations of those traits back the tests and the `sitefx` CLI.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sitefx::platform::{MemoryContainer, MemoryMedia, MemoryPlatform};
//! use sitefx::player::{PlayerController, PlayerStatus, PlayerVariant};
//! use sitefx::SiteConfig;
//!
//! # fn main() -> sitefx::Result<()> {
//! let media = Arc::new(MemoryMedia::new());
//! let container = Arc::new(
//!     MemoryContainer::new("hero")
//!         .with_attribute("data-player-src", "https://cdn.example/hero/playlist.m3u8")
//!         .with_attribute("data-player-lazy", "true")
//!         .with_media(media.clone()),
//! );
//! let platform = MemoryPlatform::new();
//!
//! let mut player = PlayerController::init(
//!     container,
//!     PlayerVariant::Adaptive,
//!     &platform,
//!     &SiteConfig::default(),
//! )?;
//! assert_eq!(player.state().status, PlayerStatus::Idle);
//!
//! player.toggle_play();
//! player.pump();
//! assert_eq!(player.state().status, PlayerStatus::Playing);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, PlatformError, Result};

// Browser collaborators as traits, plus in-memory implementations
pub mod platform;

// Background video player controller and visibility trigger
pub mod player;

pub mod contact;
pub mod grid;
pub mod pixelate;
pub mod tags;

// HTML scanning of authored pages (scraper-backed)
#[cfg(feature = "markup")]
pub mod markup;

// JSON reports used by the CLI
#[cfg(feature = "markup")]
pub mod report;

pub use player::{PlayerController, PlayerRegistry, PlayerStatus, PlayerVariant};

/// Site-wide tunables
///
/// The defaults are the values the production scripts hard-code:
/// - a visibility threshold of 0.1 for autoplay observers
/// - a 10 second forward buffer for the streaming client
/// - a 767px mobile breakpoint and a 250ms resize debounce for the grid
/// - a 2.5 second "copied" state on the contact button
///
/// # Examples
///
/// ```
/// let cfg = sitefx::SiteConfig::default();
/// assert_eq!(cfg.mobile_breakpoint_px, 767);
/// assert!((cfg.visibility_threshold - 0.1).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Intersection ratio at which autoplay observers report
    pub visibility_threshold: f64,
    /// Forward buffer requested from the adaptive streaming client, in seconds
    pub max_buffer_length_secs: u64,
    /// Viewports at or below this width use the mobile grid layout
    pub mobile_breakpoint_px: u32,
    /// Quiet period after the last resize before the grid is recomputed
    pub resize_debounce_ms: u64,
    /// How long the contact button stays in its "copied" state
    pub copied_reset_ms: u64,
    /// Viewport used when a report needs one
    pub viewport: Viewport,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.1,
            max_buffer_length_secs: 10,
            mobile_breakpoint_px: 767,
            resize_debounce_ms: 250,
            copied_reset_ms: 2500,
            viewport: Viewport::default(),
        }
    }
}

impl SiteConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: SiteConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject values the controllers cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(Error::Config(format!(
                "visibility_threshold must be within [0, 1], got {}",
                self.visibility_threshold
            )));
        }
        if self.mobile_breakpoint_px == 0 {
            return Err(Error::Config("mobile_breakpoint_px must be non-zero".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::Config("viewport dimensions must be non-zero".into()));
        }
        Ok(())
    }

    /// Forward buffer as a `Duration`
    pub fn max_buffer_length(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.max_buffer_length_secs)
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
