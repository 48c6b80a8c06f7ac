//! Platform surface: the browser primitives the page behaviors are wired to
//!
//! This module contains the traits controllers are written against (container
//! element, video element, streaming client, intersection observer,
//! clipboard) and deterministic in-memory implementations of each, used by the
//! tests and the CLI.

pub mod clipboard;
pub mod container;
pub mod media;
pub mod streaming;
pub mod visibility;

use std::sync::Arc;

pub use clipboard::{Clipboard, MemoryClipboard};
pub use container::{MemoryContainer, PlayerContainer};
pub use media::{CanPlayType, MediaElement, MediaEvent, MediaSnapshot, MemoryMedia, Preload};
pub use streaming::{
    MemoryStreamingProvider, QualityLevel, StreamingClient, StreamingConfig, StreamingEvent,
    StreamingProvider, StreamingRecord,
};
pub use visibility::{IntersectionEntry, MemoryObserver, ObserverHub, VisibilityObserver};

/// Page-wide primitives a controller needs beyond its own elements.
///
/// A platform without an adaptive streaming library returns `None` from
/// [`Platform::streaming_provider`]; players then fall back to direct binding.
pub trait Platform: Send + Sync {
    fn streaming_provider(&self) -> Option<Arc<dyn StreamingProvider>>;
    fn create_observer(&self) -> Box<dyn VisibilityObserver>;
}

/// In-memory platform used in tests and by the CLI
pub struct MemoryPlatform {
    streaming: Option<Arc<MemoryStreamingProvider>>,
    observers: Arc<ObserverHub>,
}

impl MemoryPlatform {
    /// A platform without a streaming library
    pub fn new() -> Self {
        MemoryPlatform {
            streaming: None,
            observers: Arc::new(ObserverHub::default()),
        }
    }

    /// A platform exposing the given streaming provider
    pub fn with_streaming(provider: MemoryStreamingProvider) -> Self {
        MemoryPlatform {
            streaming: Some(Arc::new(provider)),
            observers: Arc::new(ObserverHub::default()),
        }
    }

    pub fn streaming(&self) -> Option<&Arc<MemoryStreamingProvider>> {
        self.streaming.as_ref()
    }

    pub fn observers(&self) -> &Arc<ObserverHub> {
        &self.observers
    }

    /// Scroll `target` to the given visible ratio
    pub fn intersect(&self, target: &str, ratio: f64) -> usize {
        self.observers.intersect(target, ratio)
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MemoryPlatform {
    fn streaming_provider(&self) -> Option<Arc<dyn StreamingProvider>> {
        self.streaming
            .clone()
            .map(|p| p as Arc<dyn StreamingProvider>)
    }

    fn create_observer(&self) -> Box<dyn VisibilityObserver> {
        Box::new(self.observers.create())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_platform_provides_memory_surfaces() {
        let p = MemoryPlatform::new();
        assert!(p.streaming_provider().is_none());

        let mut obs = p.create_observer();
        obs.observe("hero", 0.1);
        assert_eq!(p.observers().active(), 1);
        assert_eq!(p.intersect("hero", 0.5), 1);
        assert_eq!(obs.take_records().len(), 1);

        let p = MemoryPlatform::with_streaming(MemoryStreamingProvider::with_default_ladder());
        let provider = p.streaming_provider().expect("provider");
        assert!(provider.is_supported());
    }
}
