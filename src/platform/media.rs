//! Video element surface used by the player controller

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::PlatformError;

/// Lifecycle events a media element emits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    /// Playback was requested and the element left the paused state
    Play,
    /// Frames are actually being produced
    Playing,
    Pause,
    /// Playback stalled waiting for data
    Waiting,
    /// Enough data is buffered to start playing
    CanPlay,
    /// Playback reached the end of the media
    Ended,
    LoadedMetadata,
    /// A play request settled with a rejection (autoplay policy and friends)
    PlayRejected(String),
}

/// The `preload` hint of a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preload {
    None,
    Metadata,
    #[default]
    Auto,
}

/// Answer of `canPlayType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanPlayType {
    No,
    Maybe,
    Probably,
}

impl CanPlayType {
    pub fn is_playable(self) -> bool {
        !matches!(self, CanPlayType::No)
    }
}

/// A video element as seen by a player controller.
///
/// Methods take `&self`: the element is shared between the container that owns
/// it and the controller that drives it. Events are buffered by the
/// implementation and handed out through [`MediaElement::take_events`].
pub trait MediaElement: Send + Sync {
    /// Request playback. An `Err` is the request's rejection; success only
    /// means the request was accepted.
    fn play(&self) -> Result<(), PlatformError>;
    fn pause(&self);
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;

    fn muted(&self) -> bool;
    fn set_muted(&self, muted: bool);
    fn set_loop(&self, looping: bool);
    fn set_autoplay(&self, autoplay: bool);
    fn set_plays_inline(&self, inline: bool);
    fn set_preload(&self, preload: Preload);

    /// Bind a source URI directly to the element
    fn set_src(&self, src: &str);

    /// Drop the current source and reload, releasing any previous binding
    fn unload(&self) -> Result<(), PlatformError>;

    fn can_play_type(&self, mime: &str) -> CanPlayType;

    /// Whether the element exposes a remote-playback switch at all
    fn supports_remote_playback(&self) -> bool {
        true
    }
    fn set_disable_remote_playback(&self, disabled: bool);

    /// Set a content attribute on the element itself
    fn set_attribute(&self, name: &str, value: &str);

    /// Drain the events emitted since the last call
    fn take_events(&self) -> Vec<MediaEvent> {
        Vec::new()
    }
}

/// Everything the in-memory element has been told, for assertions
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSnapshot {
    pub src: Option<String>,
    pub preload: Preload,
    pub paused: bool,
    pub ended: bool,
    pub muted: bool,
    pub looping: bool,
    pub autoplay: bool,
    pub plays_inline: bool,
    pub remote_playback_disabled: bool,
    pub attributes: Vec<(String, String)>,
    /// Number of `set_src` calls
    pub src_bindings: usize,
    pub unloads: usize,
    pub play_requests: usize,
}

impl Default for MediaSnapshot {
    fn default() -> Self {
        Self {
            src: None,
            preload: Preload::Auto,
            paused: true,
            ended: false,
            muted: false,
            looping: false,
            autoplay: false,
            plays_inline: false,
            remote_playback_disabled: false,
            attributes: Vec::new(),
            src_bindings: 0,
            unloads: 0,
            play_requests: 0,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryMediaInner {
    snapshot: MediaSnapshot,
    events: Vec<MediaEvent>,
    reject_play: Option<String>,
    native_hls: bool,
    remote_playback: bool,
    fail_unload: bool,
}

/// In-memory video element.
///
/// A successful `play()` from the paused state emits `play` then `playing`;
/// `pause()` from a playing state emits `pause`. Tests inject the rest
/// (`waiting`, `canplay`, `ended`) with [`MemoryMedia::emit`] or
/// [`MemoryMedia::finish`].
#[derive(Debug)]
pub struct MemoryMedia {
    inner: Mutex<MemoryMediaInner>,
}

impl MemoryMedia {
    pub fn new() -> Self {
        MemoryMedia {
            inner: Mutex::new(MemoryMediaInner {
                remote_playback: true,
                ..Default::default()
            }),
        }
    }

    /// An element that plays HLS manifests natively (Safari-style)
    pub fn native_hls() -> Self {
        let media = Self::new();
        media.lock().native_hls = true;
        media
    }

    fn lock(&self) -> MutexGuard<'_, MemoryMediaInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent play requests fail with `reason`, or succeed with `None`
    pub fn reject_play(&self, reason: Option<&str>) {
        self.lock().reject_play = reason.map(str::to_string);
    }

    /// Hide the remote-playback switch, as older engines do
    pub fn without_remote_playback(self) -> Self {
        self.lock().remote_playback = false;
        self
    }

    /// Make `unload` fail, simulating an element in an invalid state
    pub fn fail_unload(&self, fail: bool) {
        self.lock().fail_unload = fail;
    }

    /// Queue an event as if the media pipeline had fired it
    pub fn emit(&self, event: MediaEvent) {
        self.lock().events.push(event);
    }

    /// Reach the natural end of the media
    pub fn finish(&self) {
        let mut inner = self.lock();
        inner.snapshot.paused = true;
        inner.snapshot.ended = true;
        inner.events.push(MediaEvent::Pause);
        inner.events.push(MediaEvent::Ended);
    }

    pub fn snapshot(&self) -> MediaSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.lock()
            .snapshot
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

impl Default for MemoryMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for MemoryMedia {
    fn play(&self) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        inner.snapshot.play_requests += 1;
        if let Some(reason) = inner.reject_play.clone() {
            return Err(PlatformError::PlayRejected(reason));
        }
        if inner.snapshot.paused || inner.snapshot.ended {
            inner.snapshot.paused = false;
            inner.snapshot.ended = false;
            inner.events.push(MediaEvent::Play);
            inner.events.push(MediaEvent::Playing);
        }
        Ok(())
    }

    fn pause(&self) {
        let mut inner = self.lock();
        if !inner.snapshot.paused {
            inner.snapshot.paused = true;
            inner.events.push(MediaEvent::Pause);
        }
    }

    fn paused(&self) -> bool {
        self.lock().snapshot.paused
    }

    fn ended(&self) -> bool {
        self.lock().snapshot.ended
    }

    fn muted(&self) -> bool {
        self.lock().snapshot.muted
    }

    fn set_muted(&self, muted: bool) {
        self.lock().snapshot.muted = muted;
    }

    fn set_loop(&self, looping: bool) {
        self.lock().snapshot.looping = looping;
    }

    fn set_autoplay(&self, autoplay: bool) {
        self.lock().snapshot.autoplay = autoplay;
    }

    fn set_plays_inline(&self, inline: bool) {
        self.lock().snapshot.plays_inline = inline;
    }

    fn set_preload(&self, preload: Preload) {
        self.lock().snapshot.preload = preload;
    }

    fn set_src(&self, src: &str) {
        let mut inner = self.lock();
        inner.snapshot.src = Some(src.to_string());
        inner.snapshot.src_bindings += 1;
    }

    fn unload(&self) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        if inner.fail_unload {
            return Err(PlatformError::Teardown("media element rejected load()".into()));
        }
        inner.snapshot.src = None;
        inner.snapshot.paused = true;
        inner.snapshot.ended = false;
        inner.snapshot.unloads += 1;
        Ok(())
    }

    fn can_play_type(&self, mime: &str) -> CanPlayType {
        let inner = self.lock();
        match mime {
            "video/mp4" => CanPlayType::Probably,
            "application/vnd.apple.mpegurl" if inner.native_hls => CanPlayType::Maybe,
            _ => CanPlayType::No,
        }
    }

    fn supports_remote_playback(&self) -> bool {
        self.lock().remote_playback
    }

    fn set_disable_remote_playback(&self, disabled: bool) {
        self.lock().snapshot.remote_playback_disabled = disabled;
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let mut inner = self.lock();
        let attrs = &mut inner.snapshot.attributes;
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    fn take_events(&self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.lock().events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_media_play_and_pause_emit_events() {
        let m = MemoryMedia::new();
        assert!(m.paused());
        m.play().unwrap();
        assert!(!m.paused());
        m.pause();
        assert!(m.paused());
        assert_eq!(
            m.take_events(),
            vec![MediaEvent::Play, MediaEvent::Playing, MediaEvent::Pause]
        );
        assert!(m.take_events().is_empty());
    }

    #[test]
    fn rejected_play_leaves_element_paused() {
        let m = MemoryMedia::new();
        m.reject_play(Some("NotAllowedError"));
        assert_eq!(
            m.play(),
            Err(PlatformError::PlayRejected("NotAllowedError".into()))
        );
        assert!(m.paused());
        assert!(m.take_events().is_empty());
        assert_eq!(m.snapshot().play_requests, 1);
    }

    #[test]
    fn native_hls_is_reported_through_can_play_type() {
        assert!(!MemoryMedia::new()
            .can_play_type("application/vnd.apple.mpegurl")
            .is_playable());
        assert!(MemoryMedia::native_hls()
            .can_play_type("application/vnd.apple.mpegurl")
            .is_playable());
    }

    #[test]
    fn finish_marks_the_element_ended() {
        let m = MemoryMedia::new();
        m.play().unwrap();
        m.take_events();
        m.finish();
        assert!(m.ended());
        assert_eq!(m.take_events(), vec![MediaEvent::Pause, MediaEvent::Ended]);
    }
}
