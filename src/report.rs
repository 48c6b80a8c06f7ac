//! JSON reports over a scanned page

use std::time::Duration;

use serde::Serialize;

use crate::grid::GridLayout;
use crate::markup::{as_registry_input, Page};
use crate::pixelate::PixelateConfig;
use crate::platform::{
    MemoryClipboard, MemoryPlatform, MemoryStreamingProvider, PlayerContainer,
};
use crate::player::{
    AttachStrategy, PlayerConfig, PlayerState, PlayerVariant, ACTIVATED_ATTR, MUTED_ATTR,
    STATUS_ATTR,
};
use crate::tags::{style_for_label, TagStyle};
use crate::{PlayerRegistry, Result, SiteConfig};

#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    pub id: String,
    pub variant: PlayerVariant,
    /// `None` when the markup is missing a source or video element
    pub config: Option<PlayerConfig>,
    pub controls: Vec<String>,
    pub initialized: bool,
    pub strategy: Option<AttachStrategy>,
    pub state: Option<PlayerState>,
    /// Output attributes after initialization (and simulation, if any)
    pub status: Option<String>,
    pub activated: Option<String>,
    pub muted: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridReport {
    pub id: String,
    pub layout: Option<GridLayout>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagReport {
    pub id: String,
    pub label: Option<String>,
    pub style: Option<TagStyle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactReport {
    pub id: String,
    pub email: Option<String>,
    pub usable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PixelateReport {
    pub id: String,
    pub image_src: Option<String>,
    pub config: PixelateConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub viewport_width: u32,
    pub players: Vec<PlayerReport>,
    pub grids: Vec<GridReport>,
    pub tags: Vec<TagReport>,
    pub contact: Option<ContactReport>,
    pub pixelates: Vec<PixelateReport>,
}

/// Initialize every player of `page` against an in-memory platform (with a
/// streaming library available) and optionally scroll each into view at
/// `ratio`, then report the resulting state.
pub fn players(page: &Page, config: &SiteConfig, ratio: Option<f64>) -> Result<Vec<PlayerReport>> {
    let markups = page.players()?;
    let containers = page.player_containers()?;
    let platform = MemoryPlatform::with_streaming(MemoryStreamingProvider::with_default_ladder());
    let mut registry = PlayerRegistry::new(config.clone());
    registry.init_all(as_registry_input(&containers), &platform);

    if let Some(ratio) = ratio {
        for id in registry.ids().map(str::to_string).collect::<Vec<_>>() {
            platform.intersect(&id, ratio);
        }
    }
    registry.pump_all();

    let reports = markups
        .iter()
        .zip(containers.iter())
        .map(|(markup, (container, _, _))| {
            let player = registry.get(&markup.id);
            PlayerReport {
                id: markup.id.clone(),
                variant: markup.variant,
                config: player.and_then(|_| PlayerConfig::from_container(container.as_ref())),
                controls: markup.controls.clone(),
                initialized: player.is_some(),
                strategy: player.and_then(|p| p.strategy()),
                state: player.map(|p| p.state().clone()),
                status: container.attribute(STATUS_ATTR),
                activated: container.attribute(ACTIVATED_ATTR),
                muted: container.attribute(MUTED_ATTR),
            }
        })
        .collect();
    registry.release_all();
    Ok(reports)
}

/// Full page report at the configured viewport width
pub fn page(page: &Page, config: &SiteConfig, ratio: Option<f64>) -> Result<PageReport> {
    let width = config.viewport.width;

    let grids = page
        .grids()?
        .into_iter()
        .map(|grid| GridReport {
            id: grid.id,
            layout: grid
                .items
                .map(|items| GridLayout::compute(&items, width, config.mobile_breakpoint_px)),
        })
        .collect();

    let tags = page
        .tags()?
        .into_iter()
        .map(|tag| TagReport {
            style: tag.label.as_deref().and_then(style_for_label),
            id: tag.id,
            label: tag.label.map(|l| l.trim().to_string()),
        })
        .collect();

    let contact = page.contact()?.map(|c| {
        let usable = crate::contact::ContactButton::new(
            &c.id,
            c.email.as_deref(),
            std::sync::Arc::new(MemoryClipboard::new()),
            Duration::from_millis(config.copied_reset_ms),
        )
        .is_ok();
        ContactReport {
            id: c.id,
            email: c.email,
            usable,
        }
    });

    let pixelates = page
        .pixelates()?
        .into_iter()
        .map(|p| PixelateReport {
            config: p.config(),
            id: p.id,
            image_src: p.image_src,
        })
        .collect();

    Ok(PageReport {
        viewport_width: width,
        players: players(page, config, ratio)?,
        grids,
        tags,
        contact,
        pixelates,
    })
}
