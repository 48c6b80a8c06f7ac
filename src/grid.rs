//! Ratio-aware CMS image grid
//!
//! The column class follows the number of items. Single-image grids honor
//! `_inset` / `_cover` markers in the image filename (or `[inset]` /
//! `[cover]` in its alt text) to pick a cropped 2:1 (desktop) or 1:1 (mobile)
//! frame; everything else keeps its natural ratio.

use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnClass {
    #[serde(rename = "grid-1-col")]
    One,
    #[serde(rename = "grid-2-col")]
    Two,
    #[serde(rename = "grid-3-col")]
    Three,
}

impl ColumnClass {
    pub fn for_count(count: usize) -> Self {
        match count {
            1 => ColumnClass::One,
            2 => ColumnClass::Two,
            _ => ColumnClass::Three,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnClass::One => "grid-1-col",
            ColumnClass::Two => "grid-2-col",
            ColumnClass::Three => "grid-3-col",
        }
    }
}

/// Crop treatment requested by an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    Inset,
    Cover,
    Natural,
}

/// One grid item with both its wrapper and its image present
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridItem {
    /// Last path segment of the image source
    pub filename: String,
    pub alt: String,
}

impl GridItem {
    pub fn new(filename: &str, alt: &str) -> Self {
        GridItem {
            filename: filename.to_string(),
            alt: alt.to_string(),
        }
    }

    pub fn framing(&self) -> Framing {
        let filename = self.filename.to_lowercase();
        let alt = self.alt.to_lowercase();
        if filename.contains("_inset") || alt.contains("[inset]") {
            Framing::Inset
        } else if filename.contains("_cover") || alt.contains("[cover]") {
            Framing::Cover
        } else {
            Framing::Natural
        }
    }
}

/// Inline styles for an item's wrapper and image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemStyle {
    pub aspect_ratio: &'static str,
    pub object_fit: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<&'static str>,
}

impl ItemStyle {
    fn natural() -> Self {
        ItemStyle {
            aspect_ratio: "auto",
            object_fit: "cover",
            transform: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    pub columns: ColumnClass,
    pub mobile: bool,
    /// One entry per item; `None` for items missing their wrapper or image
    pub items: Vec<Option<ItemStyle>>,
}

impl GridLayout {
    /// Lay out `items` for a viewport `width` pixels wide
    pub fn compute(items: &[Option<GridItem>], width: u32, mobile_breakpoint: u32) -> Self {
        let mobile = width <= mobile_breakpoint;
        let columns = ColumnClass::for_count(items.len());
        let items = items
            .iter()
            .map(|item| item.as_ref().map(|item| style_item(item, columns, mobile)))
            .collect();
        GridLayout {
            columns,
            mobile,
            items,
        }
    }
}

fn style_item(item: &GridItem, columns: ColumnClass, mobile: bool) -> ItemStyle {
    if columns != ColumnClass::One {
        return ItemStyle::natural();
    }
    let cropped = if mobile { "1 / 1" } else { "2 / 1" };
    match item.framing() {
        Framing::Inset => ItemStyle {
            aspect_ratio: cropped,
            object_fit: "cover",
            // 125% zoom trims 10% from each side on narrow screens
            transform: Some(if mobile { "scale(1.25)" } else { "scale(1)" }),
        },
        Framing::Cover => ItemStyle {
            aspect_ratio: cropped,
            object_fit: "cover",
            transform: None,
        },
        Framing::Natural => ItemStyle::natural(),
    }
}

/// Coalesces bursts of resize events into a single relayout
#[derive(Debug, Clone)]
pub struct ResizeDebouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl ResizeDebouncer {
    pub fn new(delay: Duration) -> Self {
        ResizeDebouncer {
            delay,
            deadline: None,
        }
    }

    /// Record a resize at `now`, pushing the deadline out
    pub fn resized(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once after the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
