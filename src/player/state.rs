//! Per-player state record and its event-driven transitions

use std::fmt;

use serde::{Deserialize, Serialize};

use super::PlayerConfig;
use crate::platform::{MediaEvent, Preload};

/// Value of `data-player-status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Idle,
    Loading,
    Playing,
    Paused,
    Ready,
}

impl PlayerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerStatus::Idle => "idle",
            PlayerStatus::Loading => "loading",
            PlayerStatus::Playing => "playing",
            PlayerStatus::Paused => "paused",
            PlayerStatus::Ready => "ready",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(PlayerStatus::Idle),
            "loading" => Some(PlayerStatus::Loading),
            "playing" => Some(PlayerStatus::Playing),
            "paused" => Some(PlayerStatus::Paused),
            "ready" => Some(PlayerStatus::Ready),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether media is bound at initialization or on first need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    Eager,
    Lazy,
}

impl LoadMode {
    /// Preload hint used when the source is bound directly
    pub fn preload(self) -> Preload {
        match self {
            LoadMode::Eager => Preload::Auto,
            LoadMode::Lazy => Preload::None,
        }
    }
}

/// Why the player is currently paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseReason {
    #[default]
    None,
    /// Paused because the container left the viewport
    Visibility,
    /// Paused by a control; never overridden by visibility
    Manual,
}

/// State of one managed video element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerState {
    pub source: String,
    pub mode: LoadMode,
    pub autoplay: bool,
    pub muted_default: bool,
    attached: bool,
    pub status: PlayerStatus,
    pub activated: bool,
    pub last_pause_reason: PauseReason,
    /// A play request is out and no frame has been produced yet
    pub pending_play: bool,
    #[serde(skip)]
    status_before_play: Option<PlayerStatus>,
}

impl PlayerState {
    /// Fresh state for a configuration. Autoplay forces the muted default.
    pub fn new(config: &PlayerConfig) -> Self {
        PlayerState {
            source: config.source.clone(),
            mode: config.mode,
            autoplay: config.autoplay,
            muted_default: config.autoplay || config.muted,
            attached: false,
            status: PlayerStatus::Idle,
            activated: false,
            last_pause_reason: PauseReason::None,
            pending_play: false,
            status_before_play: None,
        }
    }

    pub fn attached(&self) -> bool {
        self.attached
    }

    /// Flip `attached` to true. Returns false if it already was.
    pub(crate) fn mark_attached(&mut self) -> bool {
        if self.attached {
            return false;
        }
        self.attached = true;
        true
    }

    /// `ready` may only be shown before any playback and with no play in flight
    pub fn may_show_ready(&self) -> bool {
        !self.pending_play && !self.activated && self.status == PlayerStatus::Idle
    }

    /// Promote `idle` to `ready` if the guard allows it
    pub fn ready_if_idle(&mut self) -> bool {
        if self.may_show_ready() {
            self.status = PlayerStatus::Ready;
            return true;
        }
        false
    }

    /// A play is about to be requested
    pub fn begin_play(&mut self) {
        if !self.pending_play {
            self.status_before_play = Some(self.status);
        }
        self.pending_play = true;
        self.last_pause_reason = PauseReason::None;
        self.status = PlayerStatus::Loading;
    }

    /// A pause is about to be requested for `reason`
    pub fn begin_pause(&mut self, reason: PauseReason) {
        self.last_pause_reason = reason;
        self.pending_play = false;
    }

    /// Whether regaining visibility should resume playback. Manual pauses are
    /// sticky.
    pub fn should_resume_on_enter(&self, media_paused: bool) -> bool {
        self.last_pause_reason == PauseReason::Visibility
            || (media_paused && self.last_pause_reason != PauseReason::Manual)
    }

    /// Apply a media lifecycle event
    pub fn apply(&mut self, event: &MediaEvent) {
        match event {
            MediaEvent::Play => {
                self.activated = true;
                self.status = PlayerStatus::Playing;
            }
            MediaEvent::Playing => {
                self.pending_play = false;
                self.status_before_play = None;
                self.status = PlayerStatus::Playing;
            }
            MediaEvent::Pause => {
                self.pending_play = false;
                self.status = PlayerStatus::Paused;
            }
            MediaEvent::Waiting => self.status = PlayerStatus::Loading,
            MediaEvent::CanPlay => {
                self.ready_if_idle();
            }
            MediaEvent::Ended => {
                self.pending_play = false;
                self.status = PlayerStatus::Paused;
                self.activated = false;
            }
            // Readiness from metadata depends on the attach strategy; the
            // controller decides.
            MediaEvent::LoadedMetadata => {}
            MediaEvent::PlayRejected(_) => {
                // Only roll back a request that never started producing frames
                if self.pending_play {
                    self.pending_play = false;
                    if let Some(previous) = self.status_before_play.take() {
                        self.status = previous;
                    }
                }
            }
        }
    }
}
