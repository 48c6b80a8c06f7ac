//! Page-level player bookkeeping

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};

use super::{PlayerController, PlayerVariant};
use crate::platform::{Platform, PlayerContainer};
use crate::{Result, SiteConfig};

/// All players initialized on a page, keyed by container id.
///
/// Initializing a container that already has a controller releases the old
/// controller first, so repeated page scans never stack observers or
/// streaming clients on the same element.
pub struct PlayerRegistry {
    settings: SiteConfig,
    players: BTreeMap<String, PlayerController>,
}

impl PlayerRegistry {
    pub fn new(settings: SiteConfig) -> Self {
        PlayerRegistry {
            settings,
            players: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &SiteConfig {
        &self.settings
    }

    /// Initialize (or re-initialize) one player
    pub fn init_player(
        &mut self,
        container: Arc<dyn PlayerContainer>,
        variant: PlayerVariant,
        platform: &dyn Platform,
    ) -> Result<&mut PlayerController> {
        let id = container.id();
        if let Some(mut previous) = self.players.remove(&id) {
            previous.release();
        }
        let controller = PlayerController::init(container, variant, platform, &self.settings)?;
        Ok(self.players.entry(id).or_insert(controller))
    }

    /// Initialize every container, skipping the ones with missing markup.
    /// Returns how many players were initialized.
    pub fn init_all<I>(&mut self, containers: I, platform: &dyn Platform) -> usize
    where
        I: IntoIterator<Item = (Arc<dyn PlayerContainer>, PlayerVariant)>,
    {
        let mut count = 0;
        for (container, variant) in containers {
            match self.init_player(container, variant, platform) {
                Ok(_) => count += 1,
                Err(e) => warn!("skipping player: {}", e),
            }
        }
        info!("initialized {} background video player(s)", count);
        count
    }

    pub fn get(&self, id: &str) -> Option<&PlayerController> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PlayerController> {
        self.players.get_mut(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.players.keys().map(String::as_str)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerController> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Pump every player; returns the total number of events handled
    pub fn pump_all(&mut self) -> usize {
        self.players.values_mut().map(PlayerController::pump).sum()
    }

    /// Tear down one player, e.g. when its element leaves the page
    pub fn release(&mut self, id: &str) -> bool {
        match self.players.remove(id) {
            Some(mut player) => {
                player.release();
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        for (_, mut player) in std::mem::take(&mut self.players) {
            player.release();
        }
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new(SiteConfig::default())
    }
}
