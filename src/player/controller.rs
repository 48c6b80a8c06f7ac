//! Controller driving one container/video pair

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};

use super::state::{PauseReason, PlayerState, PlayerStatus};
use super::strategy::AttachStrategy;
use super::visibility::{Visibility, VisibilityTrigger};
use super::{
    bool_attr, ClickTarget, Control, PlayerConfig, PlayerVariant, ACTIVATED_ATTR, MUTED_ATTR,
    STATUS_ATTR,
};
use crate::platform::{
    IntersectionEntry, MediaElement, MediaEvent, Platform, PlayerContainer, Preload,
    StreamingClient, StreamingConfig, StreamingEvent, StreamingProvider,
};
use crate::{Error, Result, SiteConfig};

/// Upper bound on event rounds handled by a single [`PlayerController::pump`]
const MAX_PUMP_ROUNDS: usize = 32;

/// Manages the media binding, playback state and status attributes of one
/// player container.
///
/// The container and video element are shared handles used for attribute I/O
/// and event polling only; all playback state lives in [`PlayerState`].
pub struct PlayerController {
    id: String,
    variant: PlayerVariant,
    state: PlayerState,
    container: Arc<dyn PlayerContainer>,
    media: Arc<dyn MediaElement>,
    provider: Option<Arc<dyn StreamingProvider>>,
    client: Option<Box<dyn StreamingClient>>,
    strategy: Option<AttachStrategy>,
    trigger: Option<VisibilityTrigger>,
    awaiting_metadata: bool,
    max_buffer_length: Duration,
}

impl PlayerController {
    /// Initialize a player for `container`.
    ///
    /// Any previous binding on the video element is stopped and cleared first,
    /// so calling this again on the same markup starts from a clean state.
    /// Fails without touching the container when the source or the video
    /// element is missing.
    ///
    /// This does not know about other controllers for the same container: a
    /// second `init` while the first controller is alive leaves both observers
    /// registered. [`PlayerRegistry::init_player`](super::PlayerRegistry::init_player)
    /// releases the previous controller first and is the idempotent entry point.
    pub fn init(
        container: Arc<dyn PlayerContainer>,
        variant: PlayerVariant,
        platform: &dyn Platform,
        settings: &SiteConfig,
    ) -> Result<Self> {
        let id = container.id();
        let config = PlayerConfig::from_container(container.as_ref())
            .ok_or_else(|| Error::MissingSource(id.clone()))?;
        let media = container
            .media()
            .ok_or_else(|| Error::MissingMedia(id.clone()))?;

        media.pause();
        if let Err(e) = media.unload() {
            debug!("ignoring media reset failure for {}: {}", id, e);
        }
        // Events of the previous binding must not leak into the new state
        let _ = media.take_events();

        if config.autoplay {
            media.set_muted(true);
            media.set_loop(true);
        } else {
            media.set_muted(config.muted);
        }
        media.set_attribute("muted", "");
        media.set_attribute("playsinline", "");
        media.set_attribute("webkit-playsinline", "");
        media.set_plays_inline(true);
        if media.supports_remote_playback() {
            media.set_disable_remote_playback(true);
        }
        if config.autoplay {
            media.set_autoplay(false);
        }

        let mut controller = PlayerController {
            id: id.clone(),
            variant,
            state: PlayerState::new(&config),
            container,
            media,
            provider: platform.streaming_provider(),
            client: None,
            strategy: None,
            trigger: None,
            awaiting_metadata: false,
            max_buffer_length: settings.max_buffer_length(),
        };
        controller.sync_attributes();
        controller.sync_muted();

        match controller.state.mode {
            super::LoadMode::Lazy => controller.media.set_preload(Preload::None),
            super::LoadMode::Eager => {
                controller.attach();
            }
        }

        if config.autoplay {
            controller.trigger = Some(VisibilityTrigger::observe(
                platform.create_observer(),
                &id,
                settings.visibility_threshold,
            ));
        }

        debug!(
            "initialized {:?} player {} ({:?}, autoplay={})",
            variant, id, controller.state.mode, config.autoplay
        );
        Ok(controller)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variant(&self) -> PlayerVariant {
        self.variant
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Strategy chosen at attach time; `None` until attached
    pub fn strategy(&self) -> Option<AttachStrategy> {
        self.strategy
    }

    /// Whether a visibility observer is connected for this player
    pub fn is_observing(&self) -> bool {
        self.trigger.as_ref().is_some_and(VisibilityTrigger::is_active)
    }

    /// Bind the media source. Only the first call does anything; returns
    /// whether this call performed the binding.
    pub fn attach(&mut self) -> bool {
        if !self.state.mark_attached() {
            return false;
        }
        self.destroy_client();

        let selected =
            AttachStrategy::select(self.variant, self.media.as_ref(), self.provider.as_deref());
        let strategy = match (selected, self.provider.clone()) {
            (AttachStrategy::StreamingClient, Some(provider)) => {
                let mut client = provider.create(StreamingConfig {
                    max_buffer_length: self.max_buffer_length,
                });
                client.attach_media(self.media.clone());
                self.client = Some(client);
                AttachStrategy::StreamingClient
            }
            (AttachStrategy::Native, _) => {
                self.bind_directly();
                self.awaiting_metadata = true;
                AttachStrategy::Native
            }
            _ => {
                self.bind_directly();
                AttachStrategy::PlainFile
            }
        };
        debug!("attached {} via {:?}", self.id, strategy);
        self.strategy = Some(strategy);
        true
    }

    fn bind_directly(&self) {
        self.media.set_preload(self.state.mode.preload());
        self.media.set_src(&self.state.source);
    }

    /// Start playback when paused or ended, pause it otherwise.
    ///
    /// A rejected play request is absorbed: the status returns to what it was
    /// before the request and a later click or visibility change may retry.
    pub fn toggle_play(&mut self) {
        if self.media.paused() || self.media.ended() {
            self.attach();
            self.state.begin_play();
            self.sync_attributes();
            if let Err(e) = self.media.play() {
                debug!("play request for {} rejected: {}", self.id, e);
                self.handle_media_event(MediaEvent::PlayRejected(e.to_string()));
            }
        } else {
            self.pause_for(PauseReason::Manual);
        }
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.media.muted();
        self.media.set_muted(muted);
        self.container.set_attribute(MUTED_ATTR, bool_attr(muted));
    }

    /// Dispatch a click delivered to the container
    pub fn handle_click(&mut self, target: &ClickTarget) {
        match target.control.as_deref().and_then(Control::parse) {
            Some(Control::TogglePlay) => self.toggle_play(),
            Some(Control::ToggleMute) => self.toggle_mute(),
            None => trace!("click on {} outside any control", self.id),
        }
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        trace!("{}: media event {:?}", self.id, event);
        if event == MediaEvent::LoadedMetadata && self.awaiting_metadata {
            self.awaiting_metadata = false;
            self.state.ready_if_idle();
        }
        self.state.apply(&event);
        self.sync_attributes();
    }

    pub fn handle_streaming_event(&mut self, event: StreamingEvent) {
        trace!("{}: streaming event {:?}", self.id, event);
        match event {
            StreamingEvent::MediaAttached => {
                if let Some(client) = self.client.as_mut() {
                    client.load_source(&self.state.source);
                }
            }
            StreamingEvent::ManifestParsed { levels } => {
                if let Some(client) = self.client.as_mut() {
                    if !levels.is_empty() {
                        client.set_start_level(levels.len() - 1);
                    }
                }
                self.state.ready_if_idle();
                self.sync_attributes();
            }
        }
    }

    /// Feed intersection entries. Ignored unless the player autoplays.
    pub fn handle_intersection(&mut self, entries: &[IntersectionEntry]) {
        if !self.state.autoplay {
            return;
        }
        for entry in entries {
            self.handle_visibility(Visibility::of(entry));
        }
    }

    fn handle_visibility(&mut self, change: Visibility) {
        match change {
            Visibility::Entered => {
                self.attach();
                let paused = self.media.paused();
                if self.state.should_resume_on_enter(paused) {
                    if paused {
                        self.toggle_play();
                    }
                    self.state.last_pause_reason = PauseReason::None;
                }
            }
            Visibility::Left => {
                if !self.media.paused() && !self.media.ended() {
                    self.pause_for(PauseReason::Visibility);
                }
            }
        }
    }

    fn pause_for(&mut self, reason: PauseReason) {
        self.state.begin_pause(reason);
        self.media.pause();
    }

    /// Drain observer, streaming and media events until none are left.
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        for _ in 0..MAX_PUMP_ROUNDS {
            let changes = self
                .trigger
                .as_mut()
                .map(VisibilityTrigger::take_changes)
                .unwrap_or_default();
            let streaming = self
                .client
                .as_mut()
                .map(|c| c.take_events())
                .unwrap_or_default();
            let media = self.media.take_events();
            if changes.is_empty() && streaming.is_empty() && media.is_empty() {
                break;
            }
            handled += changes.len() + streaming.len() + media.len();

            for change in changes {
                if self.state.autoplay {
                    self.handle_visibility(change);
                }
            }
            for event in streaming {
                self.handle_streaming_event(event);
            }
            for event in media {
                self.handle_media_event(event);
            }
        }
        handled
    }

    /// Disconnect the visibility observer and destroy the streaming client.
    /// Teardown failures are logged and ignored.
    pub fn release(&mut self) {
        if let Some(mut trigger) = self.trigger.take() {
            trigger.release();
        }
        self.destroy_client();
    }

    fn destroy_client(&mut self) {
        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.destroy() {
                debug!("ignoring streaming client teardown failure for {}: {}", self.id, e);
            }
        }
    }

    fn sync_attributes(&self) {
        let status = self.state.status.as_str();
        if self.container.attribute(STATUS_ATTR).as_deref() != Some(status) {
            trace!("{}: status -> {}", self.id, status);
            self.container.set_attribute(STATUS_ATTR, status);
        }
        let activated = bool_attr(self.state.activated);
        if self.container.attribute(ACTIVATED_ATTR).as_deref() != Some(activated) {
            self.container.set_attribute(ACTIVATED_ATTR, activated);
        }
    }

    fn sync_muted(&self) {
        let muted = bool_attr(self.media.muted());
        if self.container.attribute(MUTED_ATTR).as_deref() != Some(muted) {
            self.container.set_attribute(MUTED_ATTR, muted);
        }
    }

    /// Current `data-player-status` as the container reports it
    pub fn status_attribute(&self) -> Option<PlayerStatus> {
        self.container
            .attribute(STATUS_ATTR)
            .as_deref()
            .and_then(PlayerStatus::parse)
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MemoryContainer, MemoryMedia, MemoryPlatform, MemoryStreamingProvider};
    use crate::player::{AUTOPLAY_ATTR, LAZY_ATTR, SRC_ATTR};

    const HLS: &str = "https://vz.example/abc/playlist.m3u8";

    fn container(media: &Arc<MemoryMedia>, lazy: bool, autoplay: bool) -> Arc<MemoryContainer> {
        Arc::new(
            MemoryContainer::new("hero")
                .with_attribute(SRC_ATTR, HLS)
                .with_attribute(LAZY_ATTR, if lazy { "true" } else { "false" })
                .with_attribute(AUTOPLAY_ATTR, if autoplay { "true" } else { "false" })
                .with_media(media.clone()),
        )
    }

    #[test]
    fn init_writes_idle_and_inactive() {
        let media = Arc::new(MemoryMedia::new());
        let c = container(&media, true, false);
        let player = PlayerController::init(
            c.clone(),
            PlayerVariant::Adaptive,
            &MemoryPlatform::new(),
            &SiteConfig::default(),
        )
        .unwrap();
        assert_eq!(player.state().status, PlayerStatus::Idle);
        assert_eq!(c.attribute(STATUS_ATTR).as_deref(), Some("idle"));
        assert_eq!(c.attribute(ACTIVATED_ATTR).as_deref(), Some("false"));
        assert_eq!(c.attribute(MUTED_ATTR).as_deref(), Some("false"));
        assert_eq!(player.status_attribute(), Some(PlayerStatus::Idle));
    }

    #[test]
    fn init_forces_inline_silent_attributes() {
        let media = Arc::new(MemoryMedia::new());
        let c = container(&media, true, true);
        let _player = PlayerController::init(
            c,
            PlayerVariant::Adaptive,
            &MemoryPlatform::new(),
            &SiteConfig::default(),
        )
        .unwrap();
        let snap = media.snapshot();
        assert!(snap.plays_inline);
        assert!(snap.remote_playback_disabled);
        assert!(snap.muted);
        assert!(snap.looping);
        assert!(!snap.autoplay);
        assert_eq!(media.attribute("playsinline").as_deref(), Some(""));
        assert_eq!(media.attribute("webkit-playsinline").as_deref(), Some(""));
        assert_eq!(media.attribute("muted").as_deref(), Some(""));
    }

    #[test]
    fn lazy_player_binds_nothing_until_played() {
        let media = Arc::new(MemoryMedia::new());
        let platform =
            MemoryPlatform::with_streaming(MemoryStreamingProvider::with_default_ladder());
        let mut player = PlayerController::init(
            container(&media, true, false),
            PlayerVariant::Adaptive,
            &platform,
            &SiteConfig::default(),
        )
        .unwrap();
        assert!(!player.state().attached());
        assert_eq!(media.snapshot().preload, Preload::None);
        assert!(platform.streaming().unwrap().clients().is_empty());

        player.toggle_play();
        player.pump();
        assert_eq!(player.strategy(), Some(AttachStrategy::StreamingClient));
        let clients = platform.streaming().unwrap().clients();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].source.as_deref(), Some(HLS));
        assert_eq!(clients[0].start_level, Some(2));
        assert_eq!(clients[0].max_buffer_length_secs, 10);
    }

    #[test]
    fn native_player_is_ready_after_metadata() {
        let media = Arc::new(MemoryMedia::native_hls());
        let mut player = PlayerController::init(
            container(&media, false, false),
            PlayerVariant::Adaptive,
            &MemoryPlatform::new(),
            &SiteConfig::default(),
        )
        .unwrap();
        assert_eq!(player.strategy(), Some(AttachStrategy::Native));
        assert_eq!(media.snapshot().src.as_deref(), Some(HLS));
        assert_eq!(media.snapshot().preload, Preload::Auto);

        media.emit(MediaEvent::LoadedMetadata);
        player.pump();
        assert_eq!(player.state().status, PlayerStatus::Ready);
    }

    #[test]
    fn mute_control_mirrors_attribute() {
        let media = Arc::new(MemoryMedia::new());
        let c = container(&media, true, false);
        let mut player = PlayerController::init(
            c.clone(),
            PlayerVariant::Adaptive,
            &MemoryPlatform::new(),
            &SiteConfig::default(),
        )
        .unwrap();
        player.handle_click(&ClickTarget::control("mute"));
        assert!(media.muted());
        assert_eq!(c.attribute(MUTED_ATTR).as_deref(), Some("true"));
        player.handle_click(&ClickTarget::control("mute"));
        assert_eq!(c.attribute(MUTED_ATTR).as_deref(), Some("false"));
    }

    #[test]
    fn clicks_outside_controls_are_ignored() {
        let media = Arc::new(MemoryMedia::new());
        let c = container(&media, true, false);
        let mut player = PlayerController::init(
            c.clone(),
            PlayerVariant::Adaptive,
            &MemoryPlatform::new(),
            &SiteConfig::default(),
        )
        .unwrap();
        let writes = c.writes().len();
        player.handle_click(&ClickTarget::background());
        player.handle_click(&ClickTarget::control("fullscreen"));
        assert_eq!(c.writes().len(), writes);
        assert!(!player.state().attached());
    }

    #[test]
    fn rejected_play_leaves_player_idle() {
        let media = Arc::new(MemoryMedia::new());
        media.reject_play(Some("NotAllowedError"));
        let c = container(&media, true, false);
        let mut player = PlayerController::init(
            c.clone(),
            PlayerVariant::Adaptive,
            &MemoryPlatform::new(),
            &SiteConfig::default(),
        )
        .unwrap();
        player.toggle_play();
        player.pump();
        assert_eq!(player.state().status, PlayerStatus::Idle);
        assert!(!player.state().pending_play);
        assert_eq!(c.history(STATUS_ATTR), vec!["idle", "loading", "idle"]);

        media.reject_play(None);
        player.toggle_play();
        player.pump();
        assert_eq!(player.state().status, PlayerStatus::Playing);
    }

    #[test]
    fn teardown_failures_are_absorbed() {
        let media = Arc::new(MemoryMedia::new());
        media.fail_unload(true);
        let c = container(&media, false, true);
        let platform = MemoryPlatform::new();
        let mut player =
            PlayerController::init(c, PlayerVariant::Adaptive, &platform, &SiteConfig::default())
                .unwrap();
        assert!(player.is_observing());
        player.release();
        player.release();
        assert!(!player.is_observing());
        assert_eq!(platform.observers().active(), 0);
    }

    #[test]
    fn failed_client_teardown_is_absorbed_on_release() {
        let media = Arc::new(MemoryMedia::new());
        let platform =
            MemoryPlatform::with_streaming(MemoryStreamingProvider::with_default_ladder());
        let mut player = PlayerController::init(
            container(&media, false, true),
            PlayerVariant::Adaptive,
            &platform,
            &SiteConfig::default(),
        )
        .unwrap();
        assert_eq!(player.strategy(), Some(AttachStrategy::StreamingClient));
        let provider = platform.streaming().unwrap();
        provider.fail_teardown(true);

        player.release();
        assert!(!player.is_observing());
        assert_eq!(platform.observers().active(), 0);
        let record = &provider.clients()[0];
        assert!(!record.destroyed);
        assert_eq!(record.destroy_calls, 1);

        // The failed client was dropped, not retried
        player.release();
        drop(player);
        assert_eq!(provider.clients()[0].destroy_calls, 1);
    }
}
