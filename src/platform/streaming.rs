//! Adaptive streaming client (hls.js-style) used when the element cannot play
//! manifests natively

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use super::media::MediaElement;
use crate::PlatformError;

/// Construction options for a streaming client
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamingConfig {
    pub max_buffer_length: Duration,
}

/// A quality rendition listed in a parsed manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityLevel {
    pub height: u32,
    pub bitrate: u64,
}

/// Events a streaming client reports back to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum StreamingEvent {
    /// The client finished binding itself to the media element
    MediaAttached,
    /// The manifest was fetched and parsed
    ManifestParsed { levels: Vec<QualityLevel> },
}

/// One streaming client instance bound to one media element
pub trait StreamingClient: Send {
    fn attach_media(&mut self, media: Arc<dyn MediaElement>);
    fn load_source(&mut self, src: &str);
    /// Rendition to start playback with
    fn set_start_level(&mut self, level: usize);
    /// Release internal timers and connections. May fail when the instance is
    /// already in an invalid state.
    fn destroy(&mut self) -> Result<(), PlatformError>;
    fn take_events(&mut self) -> Vec<StreamingEvent>;
}

/// Capability check plus constructor for streaming clients
pub trait StreamingProvider: Send + Sync {
    fn is_supported(&self) -> bool;
    fn create(&self, config: StreamingConfig) -> Box<dyn StreamingClient>;
}

/// What an in-memory client was asked to do
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingRecord {
    pub max_buffer_length_secs: u64,
    pub attached: bool,
    pub source: Option<String>,
    pub start_level: Option<usize>,
    pub destroyed: bool,
    pub destroy_calls: usize,
}

#[derive(Debug)]
struct ClientSlot {
    record: StreamingRecord,
    events: Vec<StreamingEvent>,
    fail_teardown: bool,
}

#[derive(Debug)]
struct ProviderInner {
    supported: bool,
    levels: Vec<QualityLevel>,
    clients: Vec<Arc<Mutex<ClientSlot>>>,
    fail_teardown: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory provider. Clients it creates answer `attach_media` with
/// `MediaAttached` and `load_source` with `ManifestParsed` carrying the
/// provider's configured levels.
#[derive(Debug)]
pub struct MemoryStreamingProvider {
    inner: Mutex<ProviderInner>,
}

impl MemoryStreamingProvider {
    pub fn new(levels: Vec<QualityLevel>) -> Self {
        MemoryStreamingProvider {
            inner: Mutex::new(ProviderInner {
                supported: true,
                levels,
                clients: Vec::new(),
                fail_teardown: false,
            }),
        }
    }

    /// A ladder of 360p, 720p and 1080p renditions
    pub fn with_default_ladder() -> Self {
        Self::new(vec![
            QualityLevel { height: 360, bitrate: 800_000 },
            QualityLevel { height: 720, bitrate: 2_800_000 },
            QualityLevel { height: 1080, bitrate: 5_000_000 },
        ])
    }

    pub fn set_supported(&self, supported: bool) {
        lock(&self.inner).supported = supported;
    }

    /// Make `destroy` fail on existing and future clients
    pub fn fail_teardown(&self, fail: bool) {
        let mut inner = lock(&self.inner);
        inner.fail_teardown = fail;
        for slot in &inner.clients {
            lock(slot).fail_teardown = fail;
        }
    }

    /// Records of every client created so far, oldest first
    pub fn clients(&self) -> Vec<StreamingRecord> {
        lock(&self.inner)
            .clients
            .iter()
            .map(|slot| lock(slot).record.clone())
            .collect()
    }
}

impl StreamingProvider for MemoryStreamingProvider {
    fn is_supported(&self) -> bool {
        lock(&self.inner).supported
    }

    fn create(&self, config: StreamingConfig) -> Box<dyn StreamingClient> {
        let mut inner = lock(&self.inner);
        let slot = Arc::new(Mutex::new(ClientSlot {
            record: StreamingRecord {
                max_buffer_length_secs: config.max_buffer_length.as_secs(),
                attached: false,
                source: None,
                start_level: None,
                destroyed: false,
                destroy_calls: 0,
            },
            events: Vec::new(),
            fail_teardown: inner.fail_teardown,
        }));
        inner.clients.push(slot.clone());
        Box::new(MemoryStreamingClient {
            slot,
            levels: inner.levels.clone(),
        })
    }
}

/// Client handed out by [`MemoryStreamingProvider`]
#[derive(Debug)]
pub struct MemoryStreamingClient {
    slot: Arc<Mutex<ClientSlot>>,
    levels: Vec<QualityLevel>,
}

impl StreamingClient for MemoryStreamingClient {
    fn attach_media(&mut self, _media: Arc<dyn MediaElement>) {
        let mut slot = lock(&self.slot);
        slot.record.attached = true;
        slot.events.push(StreamingEvent::MediaAttached);
    }

    fn load_source(&mut self, src: &str) {
        let mut slot = lock(&self.slot);
        slot.record.source = Some(src.to_string());
        slot.events.push(StreamingEvent::ManifestParsed {
            levels: self.levels.clone(),
        });
    }

    fn set_start_level(&mut self, level: usize) {
        lock(&self.slot).record.start_level = Some(level);
    }

    fn destroy(&mut self) -> Result<(), PlatformError> {
        let mut slot = lock(&self.slot);
        slot.record.destroy_calls += 1;
        if slot.fail_teardown {
            return Err(PlatformError::Teardown("streaming client refused to stop".into()));
        }
        if slot.record.destroyed {
            return Err(PlatformError::Teardown("streaming client already destroyed".into()));
        }
        slot.record.destroyed = true;
        slot.events.clear();
        Ok(())
    }

    fn take_events(&mut self) -> Vec<StreamingEvent> {
        std::mem::take(&mut lock(&self.slot).events)
    }
}
