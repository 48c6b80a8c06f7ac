//! Viewport intersection observation

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::PlatformError;

/// One observation delivered by an intersection observer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionEntry {
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

impl IntersectionEntry {
    pub fn visible(ratio: f64) -> Self {
        Self {
            is_intersecting: ratio > 0.0,
            intersection_ratio: ratio,
        }
    }

    pub fn hidden() -> Self {
        Self {
            is_intersecting: false,
            intersection_ratio: 0.0,
        }
    }
}

/// An intersection observer watching a single target
pub trait VisibilityObserver: Send {
    fn observe(&mut self, target: &str, threshold: f64);
    /// Stop observing. May fail if the observer is already gone.
    fn disconnect(&mut self) -> Result<(), PlatformError>;
    /// Drain entries queued since the last call
    fn take_records(&mut self) -> Vec<IntersectionEntry>;
}

#[derive(Debug)]
struct ObserverSlot {
    target: Option<String>,
    threshold: f64,
    connected: bool,
    above_threshold: Option<bool>,
    records: Vec<IntersectionEntry>,
}

/// Shared state behind every [`MemoryObserver`] a platform hands out
#[derive(Debug, Default)]
pub struct ObserverHub {
    slots: Mutex<Vec<ObserverSlot>>,
}

impl ObserverHub {
    fn lock(&self) -> MutexGuard<'_, Vec<ObserverSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(self: &Arc<Self>) -> MemoryObserver {
        let mut slots = self.lock();
        slots.push(ObserverSlot {
            target: None,
            threshold: 0.0,
            connected: false,
            above_threshold: None,
            records: Vec::new(),
        });
        MemoryObserver {
            hub: self.clone(),
            index: slots.len() - 1,
        }
    }

    /// Move `target` to `ratio` of visibility. Connected observers of that
    /// target queue an entry when the ratio crosses their threshold, and always
    /// on their first observation.
    pub fn intersect(&self, target: &str, ratio: f64) -> usize {
        let mut delivered = 0;
        for slot in self.lock().iter_mut() {
            if !slot.connected || slot.target.as_deref() != Some(target) {
                continue;
            }
            let above = ratio > 0.0 && ratio >= slot.threshold;
            if slot.above_threshold == Some(above) {
                continue;
            }
            slot.above_threshold = Some(above);
            slot.records.push(IntersectionEntry::visible(ratio));
            delivered += 1;
        }
        delivered
    }

    /// Number of observers currently connected
    pub fn active(&self) -> usize {
        self.lock().iter().filter(|s| s.connected).count()
    }

    pub fn active_for(&self, target: &str) -> usize {
        self.lock()
            .iter()
            .filter(|s| s.connected && s.target.as_deref() == Some(target))
            .count()
    }
}

/// Observer handed out by [`ObserverHub::create`]
#[derive(Debug)]
pub struct MemoryObserver {
    hub: Arc<ObserverHub>,
    index: usize,
}

impl VisibilityObserver for MemoryObserver {
    fn observe(&mut self, target: &str, threshold: f64) {
        if let Some(slot) = self.hub.lock().get_mut(self.index) {
            slot.target = Some(target.to_string());
            slot.threshold = threshold;
            slot.connected = true;
        }
    }

    fn disconnect(&mut self) -> Result<(), PlatformError> {
        let mut slots = self.hub.lock();
        match slots.get_mut(self.index) {
            Some(slot) if slot.connected => {
                slot.connected = false;
                slot.records.clear();
                Ok(())
            }
            _ => Err(PlatformError::Teardown("observer is not connected".into())),
        }
    }

    fn take_records(&mut self) -> Vec<IntersectionEntry> {
        self.hub
            .lock()
            .get_mut(self.index)
            .map(|slot| std::mem::take(&mut slot.records))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_delivered_on_threshold_crossings_only() {
        let hub = Arc::new(ObserverHub::default());
        let mut obs = hub.create();
        obs.observe("hero", 0.1);

        assert_eq!(hub.intersect("hero", 0.2), 1);
        assert_eq!(hub.intersect("hero", 0.6), 0);
        assert_eq!(hub.intersect("hero", 0.0), 1);
        assert_eq!(hub.intersect("other", 0.5), 0);

        let records = obs.take_records();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_intersecting);
        assert!(!records[1].is_intersecting);
    }

    #[test]
    fn disconnected_observers_stop_receiving() {
        let hub = Arc::new(ObserverHub::default());
        let mut obs = hub.create();
        obs.observe("hero", 0.1);
        assert_eq!(hub.active(), 1);
        obs.disconnect().unwrap();
        assert_eq!(hub.active(), 0);
        assert_eq!(hub.intersect("hero", 1.0), 0);
        assert!(obs.disconnect().is_err());
    }
}
