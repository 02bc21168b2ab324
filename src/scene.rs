// this_file: src/scene.rs
//! JSON scene descriptions for the `drawcache` CLI.
//!
//! A scene is a canvas size, a background colour, an optional font and a list
//! of rectangles and labels that is drawn `frames` times. Redrawing the same
//! items is what makes the texture cache pay off, so the CLI reports cache
//! statistics after the last frame.
//!
//! ```json
//! {
//!   "width": 320, "height": 240,
//!   "background": {"r": 240, "g": 240, "b": 240},
//!   "frames": 3,
//!   "cache": {"capacity": {"entries": 64}},
//!   "font": {"path": "DejaVuSans.ttf", "size": 16},
//!   "items": [
//!     {"type": "rect", "area": {"x1": 10, "y1": 10, "x2": 109, "y2": 59},
//!      "radius": 8, "bg_color": {"r": 40, "g": 120, "b": 200},
//!      "shadow_width": 12, "shadow_ofs_y": 4, "shadow_opa": 120},
//!     {"type": "label", "area": {"x1": 20, "y1": 20, "x2": 100, "y2": 40},
//!      "text": "Hello", "color": {"r": 255, "g": 255, "b": 255}}
//!   ]
//! }
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::config::{CacheConfig, OpacityThresholds, OPA_COVER};
use crate::draw::{BgImage, BorderSide, LabelDsc, RectDsc, Renderer};
use crate::error::{Error, Result};
use crate::font::{BakeOptions, BitmapFont};
use crate::geometry::{Area, Color, Coord, Rect};
use crate::mask::MaskRasterizer;

/// Largest accepted canvas side.
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// Largest accepted frame count.
pub const MAX_FRAMES: u32 = 10_000;

/// Scene file contents.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scene {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Canvas colour
    #[serde(default = "default_background")]
    pub background: Color,
    /// Number of times the items are drawn
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Cache bound; environment overrides apply when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
    /// Opacity policy
    #[serde(default)]
    pub opacity: OpacityThresholds,
    /// Font used by every label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontSpec>,
    /// Items in painting order
    pub items: Vec<Item>,
}

/// Font to bake for labels.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FontSpec {
    /// TrueType/OpenType file, relative to the scene file
    pub path: Utf8PathBuf,
    /// Pixel size
    pub size: f32,
    /// Bits per pixel of the baked glyphs
    #[serde(default = "default_bpp")]
    pub bpp: u8,
}

/// One drawable item.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    /// Styled rectangle
    Rect {
        /// Rectangle area (inclusive corners)
        area: Area,
        /// Style
        #[serde(flatten)]
        style: RectStyle,
    },
    /// Text drawn with the scene font
    Label {
        /// Label area (inclusive corners)
        area: Area,
        /// Text, `\n` breaks lines
        text: String,
        /// Text colour
        #[serde(default)]
        color: Color,
        /// Opacity
        #[serde(default = "default_opa")]
        opa: u8,
        /// Extra space after every glyph
        #[serde(default)]
        letter_space: Coord,
        /// Extra space between lines
        #[serde(default)]
        line_space: Coord,
    },
}

/// Border side names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    None,
    Top,
    Bottom,
    Left,
    Right,
    Full,
}

impl From<Side> for BorderSide {
    fn from(side: Side) -> Self {
        match side {
            Side::None => BorderSide::NONE,
            Side::Top => BorderSide::TOP,
            Side::Bottom => BorderSide::BOTTOM,
            Side::Left => BorderSide::LEFT,
            Side::Right => BorderSide::RIGHT,
            Side::Full => BorderSide::FULL,
        }
    }
}

/// Procedural background image: a checkerboard of `color` and transparency.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatternSpec {
    /// Image id, shared ids share one cached texture
    pub id: u64,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Square size of the checkerboard
    #[serde(default = "default_cell")]
    pub cell: u32,
    /// Colour of the opaque squares
    #[serde(default)]
    pub color: Color,
    /// Opacity
    #[serde(default = "default_opa")]
    pub opa: u8,
    /// Repeat across the rectangle
    #[serde(default)]
    pub tiled: bool,
}

/// Rectangle style as written in a scene; mirrors [`RectDsc`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RectStyle {
    pub radius: Coord,
    pub bg_color: Color,
    pub bg_opa: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_image: Option<PatternSpec>,
    pub border_color: Color,
    pub border_width: Coord,
    pub border_opa: u8,
    pub border_side: Vec<Side>,
    pub outline_color: Color,
    pub outline_width: Coord,
    pub outline_pad: Coord,
    pub outline_opa: u8,
    pub shadow_color: Color,
    pub shadow_width: Coord,
    pub shadow_ofs_x: Coord,
    pub shadow_ofs_y: Coord,
    pub shadow_spread: Coord,
    pub shadow_opa: u8,
}

impl Default for RectStyle {
    fn default() -> Self {
        let dsc = RectDsc::default();
        Self {
            radius: dsc.radius,
            bg_color: dsc.bg_color,
            bg_opa: dsc.bg_opa,
            bg_image: None,
            border_color: dsc.border_color,
            border_width: dsc.border_width,
            border_opa: dsc.border_opa,
            border_side: vec![Side::Full],
            outline_color: dsc.outline_color,
            outline_width: dsc.outline_width,
            outline_pad: dsc.outline_pad,
            outline_opa: dsc.outline_opa,
            shadow_color: dsc.shadow_color,
            shadow_width: dsc.shadow_width,
            shadow_ofs_x: dsc.shadow_ofs_x,
            shadow_ofs_y: dsc.shadow_ofs_y,
            shadow_spread: dsc.shadow_spread,
            shadow_opa: dsc.shadow_opa,
        }
    }
}

impl RectStyle {
    /// Draw descriptor for this style.
    pub fn to_dsc(&self) -> RectDsc {
        let border_side = self
            .border_side
            .iter()
            .fold(BorderSide::NONE, |sides, &side| sides | side.into());
        RectDsc {
            radius: self.radius,
            bg_color: self.bg_color,
            bg_opa: self.bg_opa,
            bg_img: self.bg_image.as_ref().map(PatternSpec::to_bg_image),
            border_color: self.border_color,
            border_width: self.border_width,
            border_opa: self.border_opa,
            border_side,
            border_post: false,
            outline_color: self.outline_color,
            outline_width: self.outline_width,
            outline_pad: self.outline_pad,
            outline_opa: self.outline_opa,
            shadow_color: self.shadow_color,
            shadow_width: self.shadow_width,
            shadow_ofs_x: self.shadow_ofs_x,
            shadow_ofs_y: self.shadow_ofs_y,
            shadow_spread: self.shadow_spread,
            shadow_opa: self.shadow_opa,
        }
    }
}

impl PatternSpec {
    fn to_bg_image(&self) -> BgImage {
        let cell = self.cell.max(1);
        let Color { r, g, b } = self.color;
        let pixels = RgbaImage::from_fn(self.width, self.height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgba([r, g, b, 0xFF])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        BgImage {
            id: self.id,
            source: (self.width > 0 && self.height > 0).then(|| Arc::new(pixels)),
            opa: self.opa,
            recolor: Color::WHITE,
            tiled: self.tiled,
        }
    }
}

fn default_background() -> Color {
    Color::WHITE
}

fn default_frames() -> u32 {
    1
}

fn default_bpp() -> u8 {
    4
}

fn default_opa() -> u8 {
    OPA_COVER
}

fn default_cell() -> u32 {
    4
}

/// Parse and validate a scene from JSON.
pub fn parse_scene(json: &str) -> Result<Scene> {
    let scene: Scene =
        serde_json::from_str(json).map_err(|e| Error::Scene(format!("JSON parse error: {}", e)))?;
    validate_scene(&scene)?;
    Ok(scene)
}

/// Read, parse and validate a scene file.
pub fn load_scene(path: &Utf8Path) -> Result<Scene> {
    let json = std::fs::read_to_string(path)?;
    parse_scene(&json)
}

/// Check sizes, frame count, areas and font settings.
pub fn validate_scene(scene: &Scene) -> Result<()> {
    if scene.width == 0 || scene.height == 0 {
        return Err(Error::Scene(format!(
            "Canvas size must be non-zero, got {}x{}",
            scene.width, scene.height
        )));
    }
    if scene.width > MAX_CANVAS_SIDE || scene.height > MAX_CANVAS_SIDE {
        return Err(Error::Scene(format!(
            "Canvas {}x{} exceeds the {} pixel limit",
            scene.width, scene.height, MAX_CANVAS_SIDE
        )));
    }
    if scene.frames == 0 || scene.frames > MAX_FRAMES {
        return Err(Error::Scene(format!(
            "Frame count must be between 1 and {}, got {}",
            MAX_FRAMES, scene.frames
        )));
    }
    if let Some(font) = &scene.font {
        if !(font.size.is_finite() && font.size > 0.0 && font.size <= 1000.0) {
            return Err(Error::Scene(format!("Invalid font size {}", font.size)));
        }
        if !matches!(font.bpp, 1 | 2 | 4 | 8) {
            return Err(Error::Scene(format!("Invalid font bpp {}", font.bpp)));
        }
    }

    for (index, item) in scene.items.iter().enumerate() {
        let area = match item {
            Item::Rect { area, style } => {
                if let Some(image) = &style.bg_image {
                    if image.width > MAX_CANVAS_SIDE || image.height > MAX_CANVAS_SIDE {
                        return Err(Error::Scene(format!(
                            "Item {}: background image {}x{} is too large",
                            index, image.width, image.height
                        )));
                    }
                }
                area
            }
            Item::Label { area, .. } => {
                if scene.font.is_none() {
                    return Err(Error::Scene(format!(
                        "Item {}: labels need a scene font",
                        index
                    )));
                }
                area
            }
        };
        if area.x2 < area.x1 || area.y2 < area.y1 {
            return Err(Error::Scene(format!(
                "Item {}: inverted area ({}, {})..({}, {})",
                index, area.x1, area.y1, area.x2, area.y2
            )));
        }
    }
    Ok(())
}

/// A drawable item with its descriptors resolved.
#[derive(Debug, Clone)]
pub enum DrawItem {
    Rect { area: Area, dsc: RectDsc },
    Label { area: Area, dsc: LabelDsc, text: String },
}

/// Scene with its font baked and its styles converted, ready to draw.
#[derive(Debug, Clone)]
pub struct PreparedScene {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub frames: u32,
    pub opacity: OpacityThresholds,
    pub items: Vec<DrawItem>,
}

impl Scene {
    /// Cache configuration: the scene's own, or the environment's.
    pub fn cache_config(&self) -> CacheConfig {
        self.cache.unwrap_or_else(CacheConfig::from_env)
    }

    /// Bake the font and convert every item. Relative font paths resolve
    /// against `base_dir`.
    pub fn prepare(&self, base_dir: Option<&Utf8Path>) -> Result<PreparedScene> {
        let font = match &self.font {
            Some(spec) => {
                let path = match base_dir {
                    Some(dir) if spec.path.is_relative() => dir.join(&spec.path),
                    _ => spec.path.clone(),
                };
                let options = BakeOptions {
                    size: spec.size,
                    bpp: spec.bpp,
                    ..BakeOptions::default()
                };
                Some(Arc::new(BitmapFont::load(path.as_std_path(), &options)?))
            }
            None => None,
        };

        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                Item::Rect { area, style } => items.push(DrawItem::Rect {
                    area: *area,
                    dsc: style.to_dsc(),
                }),
                Item::Label {
                    area,
                    text,
                    color,
                    opa,
                    letter_space,
                    line_space,
                } => {
                    let Some(font) = &font else {
                        warn!("Skipping label {:?}: no scene font", text);
                        continue;
                    };
                    items.push(DrawItem::Label {
                        area: *area,
                        dsc: LabelDsc {
                            font: Arc::clone(font),
                            color: *color,
                            opa: *opa,
                            letter_space: *letter_space,
                            line_space: *line_space,
                        },
                        text: text.clone(),
                    });
                }
            }
        }
        debug!("Prepared scene with {} item(s)", items.len());

        Ok(PreparedScene {
            width: self.width,
            height: self.height,
            background: self.background,
            frames: self.frames,
            opacity: self.opacity,
            items,
        })
    }
}

impl PreparedScene {
    /// Canvas area.
    pub fn canvas(&self) -> Area {
        Area::from_origin_size(0, 0, self.width as Coord, self.height as Coord)
    }

    /// Clear the canvas and draw every item once.
    pub fn draw_frame<B: Backend, M: MaskRasterizer>(&self, renderer: &mut Renderer<B, M>) {
        let canvas = self.canvas();
        let backend = renderer.backend_mut();
        backend.set_clip_rect(None);
        backend.fill_rect(
            Rect::new(0, 0, self.width as Coord, self.height as Coord),
            self.background,
            OPA_COVER,
        );

        for item in &self.items {
            match item {
                DrawItem::Rect { area, dsc } => renderer.draw_rect(area, &canvas, dsc),
                DrawItem::Label { area, dsc, text } => {
                    renderer.draw_label(area, &canvas, dsc, text)
                }
            }
        }
    }
}
