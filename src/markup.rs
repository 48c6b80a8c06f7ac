//! Page scanning: finds the elements each behavior attaches to
//!
//! Parsing is done once with `scraper`; the scan results are plain records
//! that can be turned into in-memory containers for the player controllers.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::grid::GridItem;
use crate::pixelate::{PixelateConfig, IMAGE_ATTR, RENDER_ATTR};
use crate::platform::{MemoryContainer, MemoryMedia, PlayerContainer};
use crate::player::{ClickTarget, PlayerVariant, ADAPTIVE_INIT_ATTR, CONTROL_ATTR};
use crate::{Error, Result};

/// A player container as authored in the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerMarkup {
    pub id: String,
    pub variant: PlayerVariant,
    pub attributes: BTreeMap<String, String>,
    /// Whether a `<video>` element sits inside the container
    pub has_video: bool,
    /// `data-player-control` values found inside the container
    pub controls: Vec<String>,
}

impl PlayerMarkup {
    /// In-memory container carrying the authored attributes, with a fresh
    /// video element when the markup has one
    pub fn to_container(&self) -> (Arc<MemoryContainer>, Option<Arc<MemoryMedia>>) {
        let mut container = self
            .attributes
            .iter()
            .fold(MemoryContainer::new(self.id.clone()), |c, (k, v)| {
                c.with_attribute(k, v)
            });
        let media = self.has_video.then(|| Arc::new(MemoryMedia::new()));
        if let Some(media) = &media {
            container = container.with_media(media.clone());
        }
        (Arc::new(container), media)
    }
}

/// A `[data-dynamic-grid="true"]` wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridMarkup {
    pub id: String,
    /// `None` when the wrapper has no `.cms-project-grid`
    pub items: Option<Vec<Option<GridItem>>>,
}

/// A `.portfolio-tag-item` with its label text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagMarkup {
    pub id: String,
    pub label: Option<String>,
}

/// A `[data-pixelate-render]` root and its image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelateMarkup {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
    /// `src` of the `[data-pixelate-render-img]` element
    pub image_src: Option<String>,
}

impl PixelateMarkup {
    pub fn config(&self) -> PixelateConfig {
        PixelateConfig::from_attributes(&self.attributes)
    }
}

/// The `.contact-button` element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMarkup {
    pub id: String,
    pub email: Option<String>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Markup(format!("bad selector {:?}: {:?}", css, e)))
}

fn element_id(el: &ElementRef<'_>, prefix: &str, index: usize) -> String {
    el.value()
        .attr("id")
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-{}", prefix, index))
}

/// Last path segment of an image URL, without query or fragment
pub fn image_filename(src: &str) -> String {
    let base = Url::parse("https://page.invalid/").ok();
    let parsed = Url::parse(src)
        .ok()
        .or_else(|| base.and_then(|b| b.join(src).ok()));
    match parsed {
        Some(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        None => src.rsplit('/').next().unwrap_or_default().to_string(),
    }
}

/// Make ids unique in document order. A repeated id, or an authored id that
/// matches a generated one, gets a `-2`, `-3`, ... suffix on later elements.
fn unique_ids(ids: Vec<String>) -> Vec<String> {
    let taken: HashSet<String> = ids.iter().cloned().collect();
    let mut used = HashSet::new();
    ids.into_iter()
        .map(|id| {
            if used.insert(id.clone()) {
                return id;
            }
            let unique = (2..)
                .map(|n| format!("{}-{}", id, n))
                .find(|candidate| !taken.contains(candidate) && !used.contains(candidate))
                .unwrap_or_default();
            warn!("duplicate element id {:?}, using {:?}", id, unique);
            used.insert(unique.clone());
            unique
        })
        .collect()
}

/// What a container's click listener sees for a click on `target`: the
/// closest `[data-player-control]` at or above the target, searched no higher
/// than the container itself. `None` if `target` is outside `container`.
pub fn resolve_click<'a>(container: ElementRef<'a>, target: ElementRef<'a>) -> Option<ClickTarget> {
    let mut control = None;
    let mut node = Some(*target);
    while let Some(current) = node {
        if let Some(el) = ElementRef::wrap(current) {
            control = control.or_else(|| el.value().attr(CONTROL_ATTR));
            if el == container {
                return Some(control.map_or_else(ClickTarget::background, ClickTarget::control));
            }
        }
        node = current.parent();
    }
    None
}

/// A parsed page
pub struct Page {
    document: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Page {
            document: Html::parse_document(html),
        }
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Ok(Self::parse(&html))
    }

    /// Container elements with their ids, in document order
    fn player_elements(&self) -> Result<Vec<(ElementRef<'_>, String, PlayerVariant)>> {
        let containers = selector(&format!(
            "[{}], [{}]",
            PlayerVariant::Adaptive.init_attribute(),
            PlayerVariant::Simple.init_attribute()
        ))?;
        let elements: Vec<ElementRef<'_>> = self.document.select(&containers).collect();
        let ids = unique_ids(
            elements
                .iter()
                .enumerate()
                .map(|(index, el)| element_id(el, "player", index))
                .collect(),
        );
        Ok(elements
            .into_iter()
            .zip(ids)
            .map(|(el, id)| {
                let variant = if el.value().attr(ADAPTIVE_INIT_ATTR).is_some() {
                    PlayerVariant::Adaptive
                } else {
                    PlayerVariant::Simple
                };
                (el, id, variant)
            })
            .collect())
    }

    /// Player containers in document order. A container carrying both init
    /// markers is reported once, as adaptive. Ids are unique across the page.
    pub fn players(&self) -> Result<Vec<PlayerMarkup>> {
        let video = selector("video")?;
        let control = selector(&format!("[{}]", CONTROL_ATTR))?;

        let players: Vec<PlayerMarkup> = self
            .player_elements()?
            .into_iter()
            .map(|(el, id, variant)| PlayerMarkup {
                id,
                variant,
                attributes: el
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                has_video: el.select(&video).next().is_some(),
                controls: el
                    .select(&control)
                    .filter_map(|c| c.value().attr(CONTROL_ATTR))
                    .map(str::to_string)
                    .collect(),
            })
            .collect();
        debug!("found {} player container(s)", players.len());
        Ok(players)
    }

    /// Resolve a click on the first element matching `target` as delivered to
    /// the container of player `player_id`.
    ///
    /// `Ok(None)` when the player is unknown or the target is not inside it,
    /// so its click listener would never fire.
    pub fn click_target(&self, player_id: &str, target: &str) -> Result<Option<ClickTarget>> {
        let target_selector = selector(target)?;
        let Some(container) = self
            .player_elements()?
            .into_iter()
            .find(|(_, id, _)| id == player_id)
            .map(|(el, _, _)| el)
        else {
            return Ok(None);
        };
        Ok(self
            .document
            .select(&target_selector)
            .next()
            .and_then(|el| resolve_click(container, el)))
    }

    /// Player containers ready for [`crate::PlayerRegistry::init_all`], with
    /// handles to their in-memory video elements
    pub fn player_containers(
        &self,
    ) -> Result<Vec<(Arc<MemoryContainer>, Option<Arc<MemoryMedia>>, PlayerVariant)>> {
        Ok(self
            .players()?
            .iter()
            .map(|markup| {
                let (container, media) = markup.to_container();
                (container, media, markup.variant)
            })
            .collect())
    }

    pub fn grids(&self) -> Result<Vec<GridMarkup>> {
        let wrappers = selector(r#"[data-dynamic-grid="true"]"#)?;
        let grid = selector(".cms-project-grid")?;
        let item = selector(".cms-project-item")?;
        let image_wrapper = selector(".image-wrapper-cms")?;
        let image = selector(".image-cms")?;

        Ok(self
            .document
            .select(&wrappers)
            .enumerate()
            .map(|(index, wrapper)| {
                let items = wrapper.select(&grid).next().map(|grid| {
                    grid.select(&item)
                        .map(|item| {
                            item.select(&image_wrapper).next()?;
                            let img = item.select(&image).next()?;
                            let src = img.value().attr("src").unwrap_or_default();
                            let alt = img.value().attr("alt").unwrap_or_default();
                            Some(GridItem::new(&image_filename(src), alt))
                        })
                        .collect()
                });
                GridMarkup {
                    id: element_id(&wrapper, "grid", index),
                    items,
                }
            })
            .collect())
    }

    pub fn tags(&self) -> Result<Vec<TagMarkup>> {
        let items = selector(".portfolio-tag-item")?;
        let label = selector(".service-label")?;
        Ok(self
            .document
            .select(&items)
            .enumerate()
            .map(|(index, el)| TagMarkup {
                id: element_id(&el, "tag", index),
                label: el
                    .select(&label)
                    .next()
                    .map(|l| l.text().collect::<String>()),
            })
            .collect())
    }

    /// Pixelate roots that contain an image; roots without one are skipped
    pub fn pixelates(&self) -> Result<Vec<PixelateMarkup>> {
        let roots = selector(&format!("[{}]", RENDER_ATTR))?;
        let image = selector(&format!("[{}]", IMAGE_ATTR))?;
        let found: Vec<PixelateMarkup> = self
            .document
            .select(&roots)
            .enumerate()
            .filter_map(|(index, root)| {
                let id = element_id(&root, "pixelate", index);
                let Some(img) = root.select(&image).next() else {
                    debug!("{}: no pixelate image inside, skipping", id);
                    return None;
                };
                Some(PixelateMarkup {
                    id,
                    attributes: root
                        .value()
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    image_src: img.value().attr("src").map(str::to_string),
                })
            })
            .collect();
        debug!("found {} pixelate element(s)", found.len());
        Ok(found)
    }

    /// The first contact button, if the page has one
    pub fn contact(&self) -> Result<Option<ContactMarkup>> {
        let button = selector(".contact-button")?;
        Ok(self.document.select(&button).next().map(|el| ContactMarkup {
            id: element_id(&el, "contact", 0),
            email: el.value().attr("data-email").map(str::to_string),
        }))
    }
}

/// Pairs ready to hand to a registry
pub fn as_registry_input(
    containers: &[(Arc<MemoryContainer>, Option<Arc<MemoryMedia>>, PlayerVariant)],
) -> Vec<(Arc<dyn PlayerContainer>, PlayerVariant)> {
    containers
        .iter()
        .map(|(c, _, v)| (c.clone() as Arc<dyn PlayerContainer>, *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <div id="hero" data-bunny-background-init data-player-src="https://vz.example/hero/playlist.m3u8"
       data-player-lazy="false" data-player-autoplay="true">
    <video></video>
    <button data-player-control="playpause"><span>Play</span></button>
    <button data-player-control="mute">Mute</button>
  </div>
  <div data-bunny-simple-init data-player-src="/media/loop.mp4" data-player-lazy="true"></div>
</body></html>"#;

    #[test]
    fn players_are_found_in_document_order() {
        let page = Page::parse(PAGE);
        let players = page.players().unwrap();
        assert_eq!(players.len(), 2);

        assert_eq!(players[0].id, "hero");
        assert_eq!(players[0].variant, PlayerVariant::Adaptive);
        assert!(players[0].has_video);
        assert_eq!(players[0].controls, vec!["playpause", "mute"]);
        assert_eq!(
            players[0].attributes.get("data-player-autoplay").map(String::as_str),
            Some("true")
        );

        assert_eq!(players[1].id, "player-1");
        assert_eq!(players[1].variant, PlayerVariant::Simple);
        assert!(!players[1].has_video);
    }

    #[test]
    fn containers_carry_authored_attributes() {
        let page = Page::parse(PAGE);
        let containers = page.player_containers().unwrap();
        let (hero, media, _) = &containers[0];
        assert!(media.is_some());
        assert_eq!(
            hero.attribute("data-player-src").as_deref(),
            Some("https://vz.example/hero/playlist.m3u8")
        );
        assert!(hero.writes().is_empty());
        assert!(containers[1].1.is_none());
    }

    #[test]
    fn filenames_drop_query_strings() {
        assert_eq!(
            image_filename("https://cdn.example/a/b/Shot_Inset.jpg?w=800"),
            "Shot_Inset.jpg"
        );
        assert_eq!(image_filename("/images/plain.png"), "plain.png");
        assert_eq!(image_filename("relative/x_cover.webp"), "x_cover.webp");
    }

    #[test]
    fn clicks_resolve_to_the_closest_control() {
        let page = Page::parse(PAGE);
        assert_eq!(
            page.click_target("hero", "#hero button span").unwrap(),
            Some(ClickTarget::control("playpause"))
        );
        assert_eq!(
            page.click_target("hero", "#hero video").unwrap(),
            Some(ClickTarget::background())
        );
        assert_eq!(page.click_target("hero", "[data-bunny-simple-init]").unwrap(), None);
        assert_eq!(page.click_target("missing", "video").unwrap(), None);
    }

    #[test]
    fn controls_above_the_container_are_not_seen() {
        let page = Page::parse(
            r#"<div data-player-control="mute">
                 <div id="inner" data-bunny-background-init data-player-src="/v.mp4">
                   <video></video>
                 </div>
               </div>"#,
        );
        assert_eq!(
            page.click_target("inner", "video").unwrap(),
            Some(ClickTarget::background())
        );
        assert_eq!(page.click_target("inner", "[data-player-control]").unwrap(), None);
    }

    #[test]
    fn colliding_ids_are_made_unique() {
        let page = Page::parse(
            r#"<div data-bunny-background-init data-player-src="/a.mp4"></div>
               <div id="player-0" data-bunny-background-init data-player-src="/b.mp4"></div>
               <div id="loop" data-bunny-simple-init data-player-src="/c.mp4"></div>
               <div id="loop" data-bunny-simple-init data-player-src="/d.mp4"></div>"#,
        );
        let ids: Vec<String> = page.players().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["player-0", "player-0-2", "loop", "loop-2"]);
        assert_eq!(
            unique_ids(vec!["a".into(), "a".into(), "a-2".into()]),
            vec!["a", "a-3", "a-2"]
        );
    }

    #[test]
    fn pixelate_roots_need_an_image() {
        let page = Page::parse(
            r#"<div id="cover" data-pixelate-render data-pixelate-render-trigger="hover"
                    data-pixelate-render-steps="6">
                 <img data-pixelate-render-img src="/img/cover.jpg">
               </div>
               <div data-pixelate-render></div>"#,
        );
        let found = page.pixelates().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "cover");
        assert_eq!(found[0].image_src.as_deref(), Some("/img/cover.jpg"));
        let config = found[0].config();
        assert_eq!(config.steps, 6);
        assert_eq!(config.trigger, Some(crate::pixelate::PixelateTrigger::Hover));
    }

    #[test]
    fn contact_button_is_optional() {
        assert!(Page::parse("<p>nothing</p>").contact().unwrap().is_none());
        let page =
            Page::parse(r#"<a class="contact-button" data-email="hi@x.example">Contact</a>"#);
        let contact = page.contact().unwrap().unwrap();
        assert_eq!(contact.email.as_deref(), Some("hi@x.example"));
    }
}
