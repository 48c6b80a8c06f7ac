//! Lazy background video players
//!
//! One [`PlayerController`] manages one container/video pair: it binds the
//! source (natively, through a streaming client, or as a plain file), tracks
//! play/pause state, and mirrors that state into `data-player-*` attributes
//! for styling. Autoplay players are additionally driven by a
//! [`VisibilityTrigger`].

mod controller;
mod registry;
mod state;
mod strategy;
mod visibility;

use serde::{Deserialize, Serialize};

use crate::platform::PlayerContainer;

pub use controller::PlayerController;
pub use registry::PlayerRegistry;
pub use state::{LoadMode, PauseReason, PlayerState, PlayerStatus};
pub use strategy::{AttachStrategy, HLS_MIME};
pub use visibility::{Visibility, VisibilityTrigger};

/// Marker of adaptive (HLS) background players
pub const ADAPTIVE_INIT_ATTR: &str = "data-bunny-background-init";
/// Marker of simple MP4 background players
pub const SIMPLE_INIT_ATTR: &str = "data-bunny-simple-init";

pub const SRC_ATTR: &str = "data-player-src";
pub const LAZY_ATTR: &str = "data-player-lazy";
pub const AUTOPLAY_ATTR: &str = "data-player-autoplay";
pub const MUTED_ATTR: &str = "data-player-muted";
pub const STATUS_ATTR: &str = "data-player-status";
pub const ACTIVATED_ATTR: &str = "data-player-activated";
pub const CONTROL_ATTR: &str = "data-player-control";

/// Which init script a container is marked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerVariant {
    /// HLS source: native, streaming client, or plain-file fallback
    Adaptive,
    /// Direct file source only
    Simple,
}

impl PlayerVariant {
    pub fn init_attribute(self) -> &'static str {
        match self {
            PlayerVariant::Adaptive => ADAPTIVE_INIT_ATTR,
            PlayerVariant::Simple => SIMPLE_INIT_ATTR,
        }
    }
}

/// Configuration read from a container's attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub source: String,
    pub mode: LoadMode,
    pub autoplay: bool,
    pub muted: bool,
}

impl PlayerConfig {
    /// Read the configuration. `None` when the source is missing or empty.
    ///
    /// Boolean flags are true only for the literal value `"true"`.
    pub fn from_container(container: &dyn PlayerContainer) -> Option<Self> {
        let source = container.attribute(SRC_ATTR).filter(|s| !s.is_empty())?;
        let flag = |name: &str| container.attribute(name).as_deref() == Some("true");
        Some(PlayerConfig {
            source,
            mode: if flag(LAZY_ATTR) {
                LoadMode::Lazy
            } else {
                LoadMode::Eager
            },
            autoplay: flag(AUTOPLAY_ATTR),
            muted: flag(MUTED_ATTR),
        })
    }
}

/// What a `data-player-control` element asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    TogglePlay,
    ToggleMute,
}

impl Control {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "play" | "pause" | "playpause" => Some(Control::TogglePlay),
            "mute" => Some(Control::ToggleMute),
            _ => None,
        }
    }
}

/// A click delivered to a player container.
///
/// `control` is the `data-player-control` value of the closest control
/// ancestor of the event target, if one exists inside the container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    pub control: Option<String>,
}

impl ClickTarget {
    pub fn control(value: &str) -> Self {
        ClickTarget {
            control: Some(value.to_string()),
        }
    }

    /// A click that did not land on any control
    pub fn background() -> Self {
        ClickTarget::default()
    }
}

fn bool_attr(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryContainer;

    #[test]
    fn config_requires_a_non_empty_source() {
        let c = MemoryContainer::new("p");
        assert!(PlayerConfig::from_container(&c).is_none());
        let c = MemoryContainer::new("p").with_attribute(SRC_ATTR, "");
        assert!(PlayerConfig::from_container(&c).is_none());
    }

    #[test]
    fn flags_are_true_only_for_literal_true() {
        let c = MemoryContainer::new("p")
            .with_attribute(SRC_ATTR, "a.mp4")
            .with_attribute(LAZY_ATTR, "yes")
            .with_attribute(AUTOPLAY_ATTR, "true")
            .with_attribute(MUTED_ATTR, "TRUE");
        let cfg = PlayerConfig::from_container(&c).unwrap();
        assert_eq!(cfg.mode, LoadMode::Eager);
        assert!(cfg.autoplay);
        assert!(!cfg.muted);
    }

    #[test]
    fn control_values() {
        assert_eq!(Control::parse("playpause"), Some(Control::TogglePlay));
        assert_eq!(Control::parse("pause"), Some(Control::TogglePlay));
        assert_eq!(Control::parse("mute"), Some(Control::ToggleMute));
        assert_eq!(Control::parse("fullscreen"), None);
    }
}
