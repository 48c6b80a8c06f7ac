//! Pixelated image reveal
//!
//! A `[data-pixelate-render]` element draws its `[data-pixelate-render-img]`
//! through a canvas overlay that starts at a handful of columns and steps
//! towards full resolution, one stage every `duration_ms`. The overlay hides
//! once the last stage is reached.
//!
//! This module holds the pure parts: attribute parsing, the column ladder,
//! fit rectangles, block resampling of an RGBA buffer and the stage timer.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{debug, trace};
use serde::Serialize;

use crate::grid::ResizeDebouncer;

/// Marker attribute of a pixelate root
pub const RENDER_ATTR: &str = "data-pixelate-render";
/// Marker of the image inside a root
pub const IMAGE_ATTR: &str = "data-pixelate-render-img";
pub const TRIGGER_ATTR: &str = "data-pixelate-render-trigger";
pub const DURATION_ATTR: &str = "data-pixelate-render-duration";
pub const STEPS_ATTR: &str = "data-pixelate-render-steps";
pub const COLUMNS_ATTR: &str = "data-pixelate-render-columns";
pub const FIT_ATTR: &str = "data-pixelate-render-fit";

/// Visible ratio that starts an `inview` reveal
pub const IN_VIEW_THRESHOLD: f64 = 0.25;

const DEFAULT_DURATION_MS: u64 = 150;
const DEFAULT_STEPS: u32 = 12;
const DEFAULT_COLUMNS: u32 = 12;
const MIN_DURATION_MS: i64 = 16;
const RESIZE_DEBOUNCE: Duration = Duration::from_millis(250);

/// Share of the ladder that is actually played before the overlay is dropped
const LADDER_SHARE: f64 = 0.9;

/// What starts the reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelateTrigger {
    Load,
    InView,
    Hover,
    Click,
}

impl PixelateTrigger {
    /// Case-insensitive; unknown values leave the element inert
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "load" => Some(PixelateTrigger::Load),
            "inview" => Some(PixelateTrigger::InView),
            "hover" => Some(PixelateTrigger::Hover),
            "click" => Some(PixelateTrigger::Click),
            _ => None,
        }
    }
}

/// How the image is placed on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    Cover,
    Contain,
    Stretch,
}

impl FitMode {
    /// `cover` and `stretch` are recognized; any other value behaves as `contain`
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "cover" => FitMode::Cover,
            "stretch" => FitMode::Stretch,
            _ => FitMode::Contain,
        }
    }
}

/// Leading integer of an attribute value, the way `parseInt` reads it
fn leading_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Per-element settings read from `data-pixelate-render-*`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelateConfig {
    pub duration_ms: u64,
    pub steps: u32,
    /// Columns at the most pixelated stage
    pub columns: u32,
    /// `None` for an unrecognized trigger
    pub trigger: Option<PixelateTrigger>,
    pub fit: FitMode,
}

impl Default for PixelateConfig {
    fn default() -> Self {
        PixelateConfig {
            duration_ms: DEFAULT_DURATION_MS,
            steps: DEFAULT_STEPS,
            columns: DEFAULT_COLUMNS,
            trigger: Some(PixelateTrigger::Load),
            fit: FitMode::Cover,
        }
    }
}

impl PixelateConfig {
    /// Read overrides from a root's attributes. Unparseable numbers keep the
    /// defaults; parsed ones are clamped (duration >= 16, steps and columns >= 1).
    pub fn from_attributes(attributes: &BTreeMap<String, String>) -> Self {
        let int = |name: &str| attributes.get(name).and_then(|v| leading_int(v));
        let defaults = PixelateConfig::default();
        PixelateConfig {
            duration_ms: int(DURATION_ATTR)
                .map(|v| v.max(MIN_DURATION_MS) as u64)
                .unwrap_or(defaults.duration_ms),
            steps: int(STEPS_ATTR)
                .map(|v| v.clamp(1, u32::MAX as i64) as u32)
                .unwrap_or(defaults.steps),
            columns: int(COLUMNS_ATTR)
                .map(|v| v.clamp(1, u32::MAX as i64) as u32)
                .unwrap_or(defaults.columns),
            trigger: attributes
                .get(TRIGGER_ATTR)
                .filter(|v| !v.is_empty())
                .map_or(defaults.trigger, |v| PixelateTrigger::parse(v)),
            fit: attributes
                .get(FIT_ATTR)
                .filter(|v| !v.is_empty())
                .map_or(defaults.fit, |v| FitMode::parse(v)),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Column counts of each stage for a canvas `canvas_width` pixels wide.
///
/// Columns grow geometrically from `columns` towards the canvas width, but
/// only the first 90% of `steps` are kept. Values are strictly increasing.
pub fn column_ladder(canvas_width: u32, columns: u32, steps: u32) -> Vec<u32> {
    let width = canvas_width.max(1);
    let start = columns.max(1).min(width);
    let total = steps.max(1);
    let used = ((total as f64 * LADDER_SHARE).floor() as usize).max(1);
    let ratio = (width as f64 / start as f64).powf(1.0 / total as f64);

    let mut ladder: Vec<u32> = (0..used)
        .map(|i| ((start as f64 * ratio.powi(i as i32)).round() as u32).max(1))
        .collect();
    for i in 1..ladder.len() {
        if ladder[i] <= ladder[i - 1] {
            ladder[i] = ladder[i - 1] + 1;
        }
    }
    ladder
}

/// Destination of the image on the canvas; may overflow it for `cover`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FitRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl FitRect {
    pub fn compute(fit: FitMode, canvas: (u32, u32), natural: (u32, u32)) -> Self {
        let (cw, ch) = canvas;
        let (nw, nh) = natural;
        if fit == FitMode::Stretch || nw == 0 || nh == 0 {
            return FitRect {
                x: 0,
                y: 0,
                width: cw,
                height: ch,
            };
        }
        let sx = cw as f64 / nw as f64;
        let sy = ch as f64 / nh as f64;
        let scale = if fit == FitMode::Cover {
            sx.max(sy)
        } else {
            sx.min(sy)
        };
        let width = ((nw as f64 * scale).round() as u32).max(1);
        let height = ((nh as f64 * scale).round() as u32).max(1);
        FitRect {
            x: (cw as i64 - width as i64) >> 1,
            y: (ch as i64 - height as i64) >> 1,
            width,
            height,
        }
    }
}

/// Rows of the low-resolution grid for `columns` on a `width` x `height` canvas
pub fn grid_rows(columns: u32, width: u32, height: u32) -> u32 {
    let columns = columns.max(1);
    ((columns as f64 * (height as f64 / width.max(1) as f64)).round() as u32).max(1)
}

/// RGBA image, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl PixelBuffer {
    /// Fully transparent buffer
    pub fn new(width: u32, height: u32) -> Self {
        PixelBuffer {
            width,
            height,
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Self {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        PixelBuffer {
            width,
            height,
            pixels,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Nearest-neighbor resample to `width` x `height`
    pub fn resample(&self, width: u32, height: u32) -> PixelBuffer {
        if self.width == 0 || self.height == 0 {
            return PixelBuffer::new(width, height);
        }
        PixelBuffer::from_fn(width, height, |x, y| {
            let sx = ((x as u64 * 2 + 1) * self.width as u64 / (width as u64 * 2)) as u32;
            let sy = ((y as u64 * 2 + 1) * self.height as u64 / (height as u64 * 2)) as u32;
            self.get(sx, sy).unwrap_or([0; 4])
        })
    }

    /// Draw this image into a transparent `canvas` according to `fit`, clipped
    pub fn fit_into(&self, fit: FitMode, canvas: (u32, u32)) -> PixelBuffer {
        let rect = FitRect::compute(fit, canvas, (self.width, self.height));
        let scaled = self.resample(rect.width, rect.height);
        PixelBuffer::from_fn(canvas.0, canvas.1, |x, y| {
            let sx = x as i64 - rect.x;
            let sy = y as i64 - rect.y;
            if sx < 0 || sy < 0 {
                return [0; 4];
            }
            scaled.get(sx as u32, sy as u32).unwrap_or([0; 4])
        })
    }

    /// Block-pixelate to `columns` columns: down to the coarse grid, then back
    /// up to the original size without smoothing
    pub fn pixelate(&self, columns: u32) -> PixelBuffer {
        let columns = columns.max(1);
        let rows = grid_rows(columns, self.width, self.height);
        self.resample(columns, rows).resample(self.width, self.height)
    }
}

/// Interactions that may start a reveal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelateEvent {
    /// An intersection observation with the given visible ratio
    Intersect { is_intersecting: bool, ratio: f64 },
    MouseEnter,
    Click,
}

/// Where an effect is in its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelatePhase {
    /// Waiting for its trigger, showing the first stage once the image is known
    Primed,
    Playing,
    /// Last stage reached; the overlay is hidden
    Done,
}

/// Reveal state of one `[data-pixelate-render]` element.
///
/// Time is supplied by the caller: [`PixelateEffect::tick`] is meant to be
/// called once per animation frame.
#[derive(Debug, Clone)]
pub struct PixelateEffect {
    id: String,
    config: PixelateConfig,
    canvas: (u32, u32),
    natural: Option<(u32, u32)>,
    ladder: Vec<u32>,
    phase: PixelatePhase,
    stage: usize,
    stage_start: Option<Instant>,
    /// The trigger fired before the image had loaded
    start_pending: bool,
    /// One-shot triggers fire only once
    armed: bool,
    resize: ResizeDebouncer,
    pending_canvas: Option<(u32, u32)>,
}

impl PixelateEffect {
    /// `natural` is the image's intrinsic size, `None` until it has loaded.
    /// A `load` trigger starts right away (or as soon as the image loads).
    pub fn new(
        id: &str,
        config: PixelateConfig,
        canvas: (u32, u32),
        natural: Option<(u32, u32)>,
    ) -> Self {
        let canvas = (canvas.0.max(1), canvas.1.max(1));
        let mut effect = PixelateEffect {
            id: id.to_string(),
            ladder: column_ladder(canvas.0, config.columns, config.steps),
            config,
            canvas,
            natural: natural.filter(|&(w, h)| w > 0 && h > 0),
            phase: PixelatePhase::Primed,
            stage: 0,
            stage_start: None,
            start_pending: false,
            armed: true,
            resize: ResizeDebouncer::new(RESIZE_DEBOUNCE),
            pending_canvas: None,
        };
        if effect.config.trigger == Some(PixelateTrigger::Load) {
            effect.armed = false;
            effect.start();
        }
        effect
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &PixelateConfig {
        &self.config
    }

    pub fn ladder(&self) -> &[u32] {
        &self.ladder
    }

    pub fn phase(&self) -> PixelatePhase {
        self.phase
    }

    /// Whether the canvas overlay is shown. An inert effect never shows it.
    pub fn overlay_visible(&self) -> bool {
        self.config.trigger.is_some()
            && self.natural.is_some()
            && self.phase != PixelatePhase::Done
    }

    /// Columns of the stage currently on screen
    pub fn current_columns(&self) -> u32 {
        let last = self.ladder.len().saturating_sub(1);
        self.ladder
            .get(self.stage.min(last))
            .copied()
            .unwrap_or(self.config.columns)
    }

    /// Feed an interaction. Returns whether it started the reveal.
    pub fn handle(&mut self, event: PixelateEvent) -> bool {
        if !self.armed {
            return false;
        }
        let fires = match (self.config.trigger, event) {
            (
                Some(PixelateTrigger::InView),
                PixelateEvent::Intersect {
                    is_intersecting,
                    ratio,
                },
            ) => is_intersecting && ratio >= IN_VIEW_THRESHOLD,
            (Some(PixelateTrigger::Hover), PixelateEvent::MouseEnter) => true,
            (Some(PixelateTrigger::Click), PixelateEvent::Click) => true,
            _ => false,
        };
        if fires {
            self.armed = false;
            self.start();
        }
        fires
    }

    /// The image finished loading with its intrinsic size
    pub fn image_loaded(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.natural = Some((width, height));
        if self.start_pending {
            self.start_pending = false;
            self.start();
        }
    }

    fn start(&mut self) {
        if self.phase == PixelatePhase::Playing {
            return;
        }
        if self.natural.is_none() {
            self.start_pending = true;
            return;
        }
        debug!("{}: pixelate reveal over {} stage(s)", self.id, self.ladder.len());
        self.stage = 0;
        self.stage_start = None;
        self.phase = PixelatePhase::Playing;
    }

    /// Advance one animation frame at `now`. Returns the columns to draw, or
    /// `None` when the effect is not playing.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        if self.phase != PixelatePhase::Playing {
            return None;
        }
        let stage_start = *self.stage_start.get_or_insert(now);
        if now.duration_since(stage_start) >= self.config.duration() {
            self.stage += 1;
            self.stage_start = Some(now);
        }
        let columns = self.current_columns();
        if self.stage + 1 >= self.ladder.len() {
            self.phase = PixelatePhase::Done;
        }
        Some(columns)
    }

    /// The canvas was resized to `canvas` at `now`; applied by
    /// [`PixelateEffect::poll_resize`] once resizing has been quiet for 250ms
    pub fn resized(&mut self, canvas: (u32, u32), now: Instant) {
        if self.phase == PixelatePhase::Done {
            return;
        }
        self.pending_canvas = Some(canvas);
        self.resize.resized(now);
    }

    /// Apply a settled resize. The ladder follows the new canvas width.
    pub fn poll_resize(&mut self, now: Instant) -> bool {
        if !self.resize.poll(now) {
            return false;
        }
        let Some(canvas) = self.pending_canvas.take() else {
            return false;
        };
        self.canvas = (canvas.0.max(1), canvas.1.max(1));
        self.ladder = column_ladder(self.canvas.0, self.config.columns, self.config.steps);
        trace!("{}: canvas {}x{}", self.id, self.canvas.0, self.canvas.1);
        true
    }

    /// Render the current stage of `image` on the canvas
    pub fn render(&self, image: &PixelBuffer) -> PixelBuffer {
        image
            .fit_into(self.config.fit, self.canvas)
            .pixelate(self.current_columns())
    }
}
