//! Page scanning feeding the player registry and the layout helpers
#![cfg(feature = "markup")]

use std::sync::Arc;
use std::time::{Duration, Instant};

use sitefx::contact::{ContactButton, ContactState};
use sitefx::grid::{ColumnClass, GridLayout};
use sitefx::markup::{as_registry_input, Page};
use sitefx::pixelate::{FitMode, PixelateEffect, PixelateEvent, PixelatePhase};
use sitefx::platform::{MemoryClipboard, MemoryPlatform, MemoryStreamingProvider, PlayerContainer};
use sitefx::player::{AttachStrategy, PlayerStatus, STATUS_ATTR};
use sitefx::tags::style_for_label;
use sitefx::{PlayerRegistry, SiteConfig};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Studio</title></head>
<body>
  <section id="hero" data-bunny-background-init
           data-player-src="https://vz.example/hero/playlist.m3u8"
           data-player-lazy="false" data-player-autoplay="true" data-player-muted="false">
    <video></video>
  </section>
  <section id="reel" data-bunny-background-init
           data-player-src="https://vz.example/reel/playlist.m3u8" data-player-lazy="true">
    <video></video>
    <button data-player-control="playpause"><span class="label">Play</span></button>
  </section>
  <section id="about-loop" data-bunny-simple-init data-player-src="/media/about.mp4">
    <video></video>
  </section>
  <section id="empty" data-bunny-background-init><video></video></section>

  <div data-dynamic-grid="true">
    <div class="cms-project-grid">
      <div class="cms-project-item">
        <div class="image-wrapper-cms"><img class="image-cms" src="https://cdn.example/p/launch_inset.jpg" alt="Launch"></div>
      </div>
    </div>
  </div>
  <div data-dynamic-grid="true">
    <div class="cms-project-grid">
      <div class="cms-project-item"><div class="image-wrapper-cms"><img class="image-cms" src="a.jpg"></div></div>
      <div class="cms-project-item"><img class="image-cms" src="b.jpg"></div>
    </div>
  </div>

  <ul>
    <li class="portfolio-tag-item"><span class="service-label">Creative</span></li>
    <li class="portfolio-tag-item"><span class="service-label">Photography</span></li>
  </ul>

  <a class="contact-button" data-email="hello@studio.example">Contact</a>
</body>
</html>"#;

#[test]
fn registry_initializes_valid_players_only() {
    let page = Page::parse(PAGE);
    let containers = page.player_containers().unwrap();
    assert_eq!(containers.len(), 4);

    let platform = MemoryPlatform::with_streaming(MemoryStreamingProvider::with_default_ladder());
    let mut registry = PlayerRegistry::default();
    let count = registry.init_all(as_registry_input(&containers), &platform);
    assert_eq!(count, 3);
    assert!(registry.get("empty").is_none());

    let (empty, _, _) = &containers[3];
    assert!(empty.writes().is_empty());

    assert_eq!(
        registry.get("hero").unwrap().strategy(),
        Some(AttachStrategy::StreamingClient)
    );
    assert_eq!(registry.get("reel").unwrap().strategy(), None);
    assert_eq!(
        registry.get("about-loop").unwrap().strategy(),
        Some(AttachStrategy::PlainFile)
    );
}

#[test]
fn scanning_twice_keeps_one_observer_per_player() {
    let page = Page::parse(PAGE);
    let containers = page.player_containers().unwrap();
    let platform = MemoryPlatform::new();
    let mut registry = PlayerRegistry::default();

    registry.init_all(as_registry_input(&containers), &platform);
    registry.init_all(as_registry_input(&containers), &platform);

    assert_eq!(registry.len(), 3);
    assert_eq!(platform.observers().active(), 1);
    assert_eq!(platform.observers().active_for("hero"), 1);
}

#[test]
fn scrolling_the_hero_into_view_starts_it() {
    let page = Page::parse(PAGE);
    let containers = page.player_containers().unwrap();
    let platform = MemoryPlatform::new();
    let mut registry = PlayerRegistry::default();
    registry.init_all(as_registry_input(&containers), &platform);

    platform.intersect("hero", 0.25);
    registry.pump_all();

    let (hero, media, _) = &containers[0];
    assert_eq!(hero.attribute(STATUS_ATTR).as_deref(), Some("playing"));
    assert!(media.as_ref().unwrap().snapshot().muted);
    assert_eq!(
        registry.get("reel").unwrap().state().status,
        PlayerStatus::Idle
    );
}

#[test]
fn clicking_the_label_inside_a_control_plays_the_reel() {
    let page = Page::parse(PAGE);
    let containers = page.player_containers().unwrap();
    let platform = MemoryPlatform::new();
    let mut registry = PlayerRegistry::default();
    registry.init_all(as_registry_input(&containers), &platform);

    let target = page.click_target("reel", "#reel .label").unwrap().unwrap();
    assert_eq!(target.control.as_deref(), Some("playpause"));
    let reel = registry.get_mut("reel").unwrap();
    reel.handle_click(&target);
    reel.pump();
    assert_eq!(reel.state().status, PlayerStatus::Playing);

    // The hero's click listener never sees a click inside the reel
    assert_eq!(page.click_target("hero", "#reel .label").unwrap(), None);
}

const COLLIDING: &str = r#"<body>
  <div data-bunny-background-init data-player-src="/a/playlist.m3u8" data-player-autoplay="true">
    <video></video>
  </div>
  <div id="player-0" data-bunny-background-init data-player-src="/b/playlist.m3u8"
       data-player-autoplay="true"><video></video></div>
</body>"#;

#[test]
fn colliding_container_ids_get_separate_players() {
    let page = Page::parse(COLLIDING);
    let containers = page.player_containers().unwrap();
    let ids: Vec<String> = containers.iter().map(|(c, _, _)| c.id()).collect();
    assert_eq!(ids, vec!["player-0", "player-0-2"]);

    let platform = MemoryPlatform::new();
    let mut registry = PlayerRegistry::default();
    assert_eq!(registry.init_all(as_registry_input(&containers), &platform), 2);
    assert_eq!(registry.len(), 2);

    for id in &ids {
        platform.intersect(id, 0.5);
    }
    registry.pump_all();
    for (container, _, _) in &containers {
        assert_eq!(container.attribute(STATUS_ATTR).as_deref(), Some("playing"));
    }
}

#[test]
fn pixelate_elements_are_scanned_with_their_settings() {
    let page = Page::parse(
        r#"<figure id="case-study" data-pixelate-render data-pixelate-render-trigger="inview"
                   data-pixelate-render-columns="8" data-pixelate-render-fit="contain">
             <img data-pixelate-render-img src="https://cdn.example/case.jpg">
           </figure>"#,
    );
    let found = page.pixelates().unwrap();
    assert_eq!(found.len(), 1);
    let config = found[0].config();
    assert_eq!(config.columns, 8);
    assert_eq!(config.fit, FitMode::Contain);

    let mut effect = PixelateEffect::new(&found[0].id, config, (800, 450), Some((1600, 900)));
    assert_eq!(effect.ladder()[0], 8);
    assert!(effect.handle(PixelateEvent::Intersect {
        is_intersecting: true,
        ratio: 0.5,
    }));
    let start = Instant::now();
    assert_eq!(effect.tick(start), Some(8));
    let mut now = start;
    while effect.phase() == PixelatePhase::Playing {
        now += Duration::from_millis(150);
        effect.tick(now);
    }
    assert_eq!(effect.phase(), PixelatePhase::Done);
    assert!(!effect.overlay_visible());
}

#[test]
fn grids_are_laid_out_from_scanned_items() {
    let page = Page::parse(PAGE);
    let grids = page.grids().unwrap();
    assert_eq!(grids.len(), 2);

    let single = grids[0].items.as_ref().unwrap();
    let mobile = GridLayout::compute(single, 390, 767);
    assert_eq!(mobile.columns, ColumnClass::One);
    let style = mobile.items[0].as_ref().unwrap();
    assert_eq!(style.aspect_ratio, "1 / 1");
    assert_eq!(style.transform, Some("scale(1.25)"));

    let pair = grids[1].items.as_ref().unwrap();
    let layout = GridLayout::compute(pair, 1440, 767);
    assert_eq!(layout.columns, ColumnClass::Two);
    assert!(layout.items[0].is_some());
    assert!(layout.items[1].is_none());
}

#[test]
fn tags_and_contact_button_are_discovered() {
    let page = Page::parse(PAGE);
    let tags = page.tags().unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(
        style_for_label(tags[0].label.as_deref().unwrap()).unwrap().border_radius,
        "0.2em"
    );
    assert!(style_for_label(tags[1].label.as_deref().unwrap()).is_none());

    let markup = page.contact().unwrap().unwrap();
    let clipboard = Arc::new(MemoryClipboard::new());
    let mut button = ContactButton::new(
        &markup.id,
        markup.email.as_deref(),
        clipboard.clone(),
        Duration::from_millis(SiteConfig::default().copied_reset_ms),
    )
    .unwrap();
    button.hover_enter();
    assert!(button.click(Instant::now()));
    assert_eq!(button.state(), ContactState::Copied);
    assert_eq!(clipboard.contents().as_deref(), Some("hello@studio.example"));
}
