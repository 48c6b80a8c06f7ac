//! Viewport visibility trigger for autoplay players

use log::debug;

use crate::platform::{IntersectionEntry, VisibilityObserver};

/// Which side of the viewport edge an entry reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Entered,
    Left,
}

impl Visibility {
    /// Any non-zero intersection counts as in view
    pub fn of(entry: &IntersectionEntry) -> Self {
        if entry.is_intersecting && entry.intersection_ratio > 0.0 {
            Visibility::Entered
        } else {
            Visibility::Left
        }
    }
}

/// Owns the intersection observer of one player.
///
/// The observer is disconnected on [`VisibilityTrigger::release`] or when the
/// trigger is dropped.
pub struct VisibilityTrigger {
    observer: Option<Box<dyn VisibilityObserver>>,
    target: String,
}

impl VisibilityTrigger {
    pub fn observe(
        mut observer: Box<dyn VisibilityObserver>,
        target: &str,
        threshold: f64,
    ) -> Self {
        observer.observe(target, threshold);
        VisibilityTrigger {
            observer: Some(observer),
            target: target.to_string(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_active(&self) -> bool {
        self.observer.is_some()
    }

    /// Entries delivered since the last call, classified
    pub fn take_changes(&mut self) -> Vec<Visibility> {
        self.observer
            .as_mut()
            .map(|o| o.take_records())
            .unwrap_or_default()
            .iter()
            .map(Visibility::of)
            .collect()
    }

    /// Disconnect the observer. Failures are logged and ignored.
    pub fn release(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            if let Err(e) = observer.disconnect() {
                debug!("ignoring observer disconnect failure for {}: {}", self.target, e);
            }
        }
    }
}

impl Drop for VisibilityTrigger {
    fn drop(&mut self) {
        self.release();
    }
}
