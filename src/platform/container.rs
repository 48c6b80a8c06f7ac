//! Player container element: attribute I/O and access to the inner video

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::media::{MediaElement, MemoryMedia};

/// The element carrying a player's `data-player-*` attributes.
///
/// Controllers only read and write attributes through this trait and look up
/// the inner video element once at initialization; they never own the element.
pub trait PlayerContainer: Send + Sync {
    /// Stable identifier used for registry lookups and observer targets
    fn id(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    fn set_attribute(&self, name: &str, value: &str);

    /// The first `<video>` inside the container, if any
    fn media(&self) -> Option<Arc<dyn MediaElement>>;
}

#[derive(Debug, Default)]
struct ContainerInner {
    attributes: BTreeMap<String, String>,
    writes: Vec<(String, String)>,
}

/// In-memory container that records every attribute write
#[derive(Debug)]
pub struct MemoryContainer {
    id: String,
    inner: Mutex<ContainerInner>,
    media: Option<Arc<MemoryMedia>>,
}

impl MemoryContainer {
    pub fn new(id: impl Into<String>) -> Self {
        MemoryContainer {
            id: id.into(),
            inner: Mutex::new(ContainerInner::default()),
            media: None,
        }
    }

    /// Seed an authored attribute. Seeding is not recorded as a write.
    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.lock()
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_media(mut self, media: Arc<MemoryMedia>) -> Self {
        self.media = Some(media);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ContainerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn memory_media(&self) -> Option<Arc<MemoryMedia>> {
        self.media.clone()
    }

    /// Every write made through [`PlayerContainer::set_attribute`], in order
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    /// Successive values written to one attribute
    pub fn history(&self, name: &str) -> Vec<String> {
        self.lock()
            .writes
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.lock().attributes.clone()
    }
}

impl PlayerContainer for MemoryContainer {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.lock().attributes.get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        let mut inner = self.lock();
        inner
            .attributes
            .insert(name.to_string(), value.to_string());
        inner.writes.push((name.to_string(), value.to_string()));
    }

    fn media(&self) -> Option<Arc<dyn MediaElement>> {
        self.media
            .clone()
            .map(|m| m as Arc<dyn MediaElement>)
    }
}
