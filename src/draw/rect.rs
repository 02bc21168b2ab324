// this_file: src/draw/rect.rs

//! Rounded rectangles: shadow, background, background image, border and
//! outline.

use std::ops::BitOr;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use log::{error, warn};

use super::{cached_mask_texture, cached_texture, prepare_blit, Renderer};
use crate::backend::Backend;
use crate::config::OPA_COVER;
use crate::geometry::{Area, Color, Coord, Flip, Rect};
use crate::key::{BorderKey, ImageKey, RectBgKey, ShadowKey, ShapeKey};
use crate::mask::{MaskRasterizer, RadiusMask};

/// Radius that makes the shorter side fully round.
pub const RADIUS_CIRCLE: Coord = 0x7FFF;

/// Set of rectangle sides a border is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BorderSide(u8);

impl BorderSide {
    /// No border.
    pub const NONE: BorderSide = BorderSide(0x00);
    pub const BOTTOM: BorderSide = BorderSide(0x01);
    pub const TOP: BorderSide = BorderSide(0x02);
    pub const LEFT: BorderSide = BorderSide(0x04);
    pub const RIGHT: BorderSide = BorderSide(0x08);
    /// All four sides.
    pub const FULL: BorderSide = BorderSide(0x0F);

    /// Raw side bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Sides from raw bits; unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::FULL.0)
    }

    /// True when every side of `other` is in `self`.
    pub const fn contains(self, other: BorderSide) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for BorderSide {
    fn default() -> Self {
        Self::FULL
    }
}

impl BitOr for BorderSide {
    type Output = BorderSide;

    fn bitor(self, rhs: BorderSide) -> BorderSide {
        BorderSide(self.0 | rhs.0)
    }
}

/// Image drawn over the background colour.
#[derive(Debug, Clone)]
pub struct BgImage {
    /// Caller-assigned id; the cached texture is keyed by it
    pub id: u64,
    /// Decoded pixels, `None` when the image could not be provided
    pub source: Option<Arc<RgbaImage>>,
    /// Opacity
    pub opa: u8,
    /// Colour multiplied into the image
    pub recolor: Color,
    /// Repeat across the rectangle instead of centering once
    pub tiled: bool,
}

impl BgImage {
    /// Centered, opaque, untinted image.
    pub fn new(id: u64, source: Arc<RgbaImage>) -> Self {
        Self {
            id,
            source: Some(source),
            opa: OPA_COVER,
            recolor: Color::WHITE,
            tiled: false,
        }
    }
}

/// Rectangle style.
#[derive(Debug, Clone)]
pub struct RectDsc {
    /// Corner radius, [`RADIUS_CIRCLE`] for a pill or circle
    pub radius: Coord,

    pub bg_color: Color,
    /// Background opacity, invisible values skip the fill
    pub bg_opa: u8,
    /// Image drawn over the background colour
    pub bg_img: Option<BgImage>,

    pub border_color: Color,
    /// Border thickness inwards from the edge
    pub border_width: Coord,
    pub border_opa: u8,
    /// Sides the border is drawn on
    pub border_side: BorderSide,
    /// Border is drawn later by the caller, skip it here
    pub border_post: bool,

    pub outline_color: Color,
    /// Outline thickness outwards from the padding
    pub outline_width: Coord,
    /// Gap between the rectangle and the outline
    pub outline_pad: Coord,
    pub outline_opa: u8,

    pub shadow_color: Color,
    /// Blur width
    pub shadow_width: Coord,
    /// Horizontal shadow offset
    pub shadow_ofs_x: Coord,
    /// Vertical shadow offset
    pub shadow_ofs_y: Coord,
    /// Grows the shadow on every side before blurring
    pub shadow_spread: Coord,
    pub shadow_opa: u8,
}

impl Default for RectDsc {
    fn default() -> Self {
        Self {
            radius: 0,
            bg_color: Color::WHITE,
            bg_opa: OPA_COVER,
            bg_img: None,
            border_color: Color::BLACK,
            border_width: 0,
            border_opa: OPA_COVER,
            border_side: BorderSide::FULL,
            border_post: false,
            outline_color: Color::BLACK,
            outline_width: 0,
            outline_pad: 0,
            outline_opa: OPA_COVER,
            shadow_color: Color::BLACK,
            shadow_width: 0,
            shadow_ofs_x: 0,
            shadow_ofs_y: 0,
            shadow_spread: 0,
            shadow_opa: OPA_COVER,
        }
    }
}

impl<B: Backend, M: MaskRasterizer> Renderer<B, M> {
    /// Draw a rectangle clipped to `clip`.
    ///
    /// While any mask is active on the rasterizer only the background is
    /// drawn, through an uncached full-area mask dump.
    pub fn draw_rect(&mut self, coords: &Area, clip: &Area, dsc: &RectDsc) {
        if coords.intersect(clip).is_none() {
            return;
        }
        if self.masks.active_count() > 0 {
            self.draw_bg_compat(coords, clip, dsc);
            return;
        }
        self.draw_shadow(coords, clip, dsc);
        self.draw_bg_color(coords, clip, dsc);
        self.draw_bg_img(coords, clip, dsc);
        self.draw_border(coords, clip, dsc);
        self.draw_outline(coords, clip, dsc);
    }

    fn draw_bg_color(&mut self, coords: &Area, clip: &Area, dsc: &RectDsc) {
        let Some(opa) = self.opacity.resolve(dsc.bg_opa) else {
            return;
        };
        let Some(draw_area) = coords.intersect(clip) else {
            return;
        };

        let (bg_w, bg_h) = (coords.width(), coords.height());
        let circle = dsc.radius == RADIUS_CIRCLE && bg_w == bg_h;
        let (frag_w, frag_h) = if circle {
            (bg_w, bg_h)
        } else {
            ((dsc.radius + 1).min(bg_w / 2), (dsc.radius + 1).min(bg_h / 2))
        };
        if dsc.radius <= 0 || frag_w <= 0 || frag_h <= 0 {
            self.backend.set_clip_rect(Some(draw_area.to_rect()));
            self.backend.fill_rect(coords.to_rect(), dsc.bg_color, opa);
            return;
        }

        // One corner is enough; the other three are mirrored copies.
        let key = RectBgKey {
            circle,
            radius: dsc.radius,
            width: frag_w,
            height: frag_h,
        }
        .cache_key();
        let frag = Area::from_origin_size(coords.x1, coords.y1, frag_w, frag_h);
        let mask = RadiusMask::new(*coords, dsc.radius, false);

        let Self {
            backend,
            masks,
            cache,
            ..
        } = self;
        let Some(texture) = cached_mask_texture(backend, masks, cache, key, |m| {
            m.with_masks(&[mask], |m| m.dump(&frag))
        }) else {
            return;
        };

        prepare_blit(backend, texture, dsc.bg_color, opa, &draw_area);
        if circle {
            backend.blit(texture, None, coords.to_rect(), Flip::NONE);
            return;
        }

        let mut corner = frag.to_rect();
        backend.blit(texture, None, corner, Flip::NONE);
        corner.x = coords.x2 - frag_w + 1;
        backend.blit(texture, None, corner, Flip::HORIZONTAL);
        corner.y = coords.y2 - frag_h + 1;
        backend.blit(texture, None, corner, Flip::BOTH);
        corner.x = coords.x1;
        backend.blit(texture, None, corner, Flip::VERTICAL);

        // Middle column and the side edges between the corners are stretched
        // from the fragment's innermost, fully covered pixel.
        let solid = Rect::new(frag_w - 1, frag_h - 1, 1, 1);
        let middle = Rect::new(coords.x1 + frag_w, coords.y1, bg_w - frag_w * 2, bg_h);
        let left = Rect::new(coords.x1, coords.y1 + frag_h, frag_w, bg_h - frag_h * 2);
        let right = Rect {
            x: coords.x2 - frag_w + 1,
            ..left
        };
        for rect in [middle, left, right] {
            if !rect.is_empty() {
                backend.blit(texture, Some(solid), rect, Flip::NONE);
            }
        }
    }

    fn draw_bg_img(&mut self, coords: &Area, clip: &Area, dsc: &RectDsc) {
        let Some(img) = &dsc.bg_img else {
            return;
        };
        if self.opacity.is_invisible(img.opa) {
            return;
        }
        let Some(opa) = self.opacity.resolve(img.opa) else {
            return;
        };
        let Some(source) = &img.source else {
            warn!("Background image {} has no pixels; drawing colour only", img.id);
            return;
        };
        let Some(draw_area) = coords.intersect(clip) else {
            return;
        };
        let (img_w, img_h) = (source.width() as Coord, source.height() as Coord);
        if img_w <= 0 || img_h <= 0 {
            return;
        }

        let key = ImageKey {
            id: img.id,
            width: img_w,
            height: img_h,
        }
        .cache_key();
        let Self { backend, cache, .. } = self;
        let Some(texture) = cached_texture(backend, cache, key, |backend| {
            backend
                .create_texture_from_surface(source)
                .map_err(|e| error!("Failed to create image texture {}: {}", img.id, e))
                .ok()
        }) else {
            return;
        };

        prepare_blit(backend, texture, img.recolor, opa, &draw_area);
        if !img.tiled {
            let x = coords.x1 + coords.width() / 2 - img_w / 2;
            let y = coords.y1 + coords.height() / 2 - img_h / 2;
            backend.blit(texture, None, Rect::new(x, y, img_w, img_h), Flip::NONE);
            return;
        }

        let mut y = coords.y1;
        while y <= coords.y2 {
            let mut x = coords.x1;
            while x <= coords.x2 {
                backend.blit(texture, None, Rect::new(x, y, img_w, img_h), Flip::NONE);
                x += img_w;
            }
            y += img_h;
        }
    }

    fn draw_shadow(&mut self, coords: &Area, clip: &Area, dsc: &RectDsc) {
        let sw = dsc.shadow_width;
        if sw <= 0 || self.opacity.is_invisible(dsc.shadow_opa) {
            return;
        }
        // A one pixel blur right under the rectangle is hidden by it.
        if sw == 1 && dsc.shadow_ofs_x == 0 && dsc.shadow_ofs_y == 0 && dsc.shadow_spread <= 0 {
            return;
        }
        let Some(opa) = self.opacity.resolve(dsc.shadow_opa) else {
            return;
        };

        let sh_rect = coords
            .translate(dsc.shadow_ofs_x, dsc.shadow_ofs_y)
            .grow(dsc.shadow_spread);
        let blur = sw / 2 + 1;
        let sh_area = sh_rect.grow(blur);
        if sh_area.is_empty() {
            return;
        }

        let key = ShadowKey {
            width: sh_area.width(),
            height: sh_area.height(),
            radius: dsc.radius,
            blur: sw,
            offset_x: dsc.shadow_ofs_x,
            offset_y: dsc.shadow_ofs_y,
        }
        .cache_key();
        let mask = RadiusMask::new(sh_rect, dsc.radius, false);

        let Self {
            backend,
            masks,
            cache,
            ..
        } = self;
        let Some(texture) = cached_mask_texture(backend, masks, cache, key, |m| {
            let mut alpha = m.with_masks(&[mask], |m| m.dump(&sh_area));
            m.blur(&mut alpha, blur as u32);
            alpha
        }) else {
            return;
        };

        prepare_blit(backend, texture, dsc.shadow_color, opa, clip);
        backend.blit(texture, None, sh_area.to_rect(), Flip::NONE);
    }

    fn draw_border(&mut self, coords: &Area, clip: &Area, dsc: &RectDsc) {
        if self.opacity.is_invisible(dsc.border_opa)
            || dsc.border_width <= 0
            || dsc.border_side == BorderSide::NONE
            || dsc.border_post
        {
            return;
        }
        let Some(opa) = self.opacity.resolve(dsc.border_opa) else {
            return;
        };
        let bw = dsc.border_width;

        if dsc.border_side != BorderSide::FULL {
            let (w, h) = (coords.width(), coords.height());
            let sides = [
                (BorderSide::TOP, Rect::new(coords.x1, coords.y1, w, bw)),
                (BorderSide::BOTTOM, Rect::new(coords.x1, coords.y2 - bw + 1, w, bw)),
                (BorderSide::LEFT, Rect::new(coords.x1, coords.y1, bw, h)),
                (BorderSide::RIGHT, Rect::new(coords.x2 - bw + 1, coords.y1, bw, h)),
            ];
            self.backend.set_clip_rect(Some(clip.to_rect()));
            for (side, rect) in sides {
                if dsc.border_side.contains(side) {
                    self.backend.fill_rect(rect, dsc.border_color, opa);
                }
            }
            return;
        }

        let rout = dsc.radius.min(coords.short_side() / 2).max(0);
        let inner = coords.grow(-bw);
        let rin = (rout - bw).max(0);
        self.draw_border_generic(clip, coords, &inner, rout, rin, dsc.border_color, opa);
    }

    fn draw_outline(&mut self, coords: &Area, clip: &Area, dsc: &RectDsc) {
        if self.opacity.is_invisible(dsc.outline_opa) || dsc.outline_width <= 0 {
            return;
        }
        let Some(opa) = self.opacity.resolve(dsc.outline_opa) else {
            return;
        };

        // A zero pad still overlaps the background edge by one pixel.
        let pad = if dsc.outline_pad == 0 {
            -1
        } else {
            dsc.outline_pad
        };
        let inner = coords.grow(pad);
        let outer = inner.grow(dsc.outline_width);
        let rin = dsc.radius.min(inner.short_side() / 2).max(0);
        let rout = rin + dsc.outline_width;
        self.draw_border_generic(clip, &outer, &inner, rout, rin, dsc.outline_color, opa);
    }

    /// Ring between `outer` and `inner`, cached unless either radius is zero.
    #[allow(clippy::too_many_arguments)]
    fn draw_border_generic(
        &mut self,
        clip: &Area,
        outer: &Area,
        inner: &Area,
        rout: Coord,
        rin: Coord,
        color: Color,
        opa: u8,
    ) {
        if rout == 0 || rin == 0 {
            self.draw_border_simple(clip, outer, inner, color, opa);
            return;
        }
        if outer.is_empty() {
            return;
        }

        let key = BorderKey {
            rout,
            rin,
            width: outer.width(),
            height: outer.height(),
            thickness: inner.x1 - outer.x1,
            side: BorderSide::FULL.bits(),
        }
        .cache_key();
        let ring = [
            RadiusMask::new(*outer, rout, false),
            RadiusMask::new(*inner, rin, true),
        ];

        let Self {
            backend,
            masks,
            cache,
            ..
        } = self;
        let Some(texture) = cached_mask_texture(backend, masks, cache, key, |m| {
            m.with_masks(&ring, |m| m.dump(outer))
        }) else {
            return;
        };

        prepare_blit(backend, texture, color, opa, clip);
        backend.blit(texture, None, outer.to_rect(), Flip::NONE);
    }

    /// Square ring as four fills.
    fn draw_border_simple(&mut self, clip: &Area, outer: &Area, inner: &Area, color: Color, opa: u8) {
        self.backend.set_clip_rect(Some(clip.to_rect()));
        if inner.is_empty() {
            self.backend.fill_rect(outer.to_rect(), color, opa);
            return;
        }
        let width = outer.width();
        let sides = [
            Rect::new(outer.x1, outer.y1, width, inner.y1 - outer.y1),
            Rect::new(outer.x1, inner.y2 + 1, width, outer.y2 - inner.y2),
            Rect::new(outer.x1, inner.y1, inner.x1 - outer.x1, inner.height()),
            Rect::new(inner.x2 + 1, inner.y1, outer.x2 - inner.x2, inner.height()),
        ];
        for rect in sides {
            if !rect.is_empty() {
                self.backend.fill_rect(rect, color, opa);
            }
        }
    }

    /// Background through every active mask, without the cache.
    fn draw_bg_compat(&mut self, coords: &Area, clip: &Area, dsc: &RectDsc) {
        let Some(opa) = self.opacity.resolve(dsc.bg_opa) else {
            return;
        };
        let Some(draw_area) = coords.intersect(clip) else {
            return;
        };

        let mask = RadiusMask::new(*coords, dsc.radius.max(0), false);
        let alpha = self.masks.with_masks(&[mask], |m| m.dump(coords));
        let surface = RgbaImage::from_fn(alpha.width(), alpha.height(), |x, y| {
            Rgba([0xFF, 0xFF, 0xFF, alpha.get(x, y)])
        });

        let texture = match self.backend.create_texture_from_surface(&surface) {
            Ok(texture) => texture,
            Err(e) => {
                error!("Failed to create masked background texture: {}", e);
                return;
            }
        };
        prepare_blit(&mut self.backend, &texture, dsc.bg_color, opa, &draw_area);
        self.backend.blit(&texture, None, coords.to_rect(), Flip::NONE);
        self.backend.destroy_texture(texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_sides_combine() {
        let sides = BorderSide::TOP | BorderSide::LEFT;
        assert!(sides.contains(BorderSide::TOP));
        assert!(!sides.contains(BorderSide::BOTTOM));
        assert!(BorderSide::FULL.contains(sides));
        assert_eq!(BorderSide::from_bits(0xFF), BorderSide::FULL);
        assert_eq!(BorderSide::default(), BorderSide::FULL);
    }

    #[test]
    fn default_style_is_opaque_white_without_decorations() {
        let dsc = RectDsc::default();
        assert_eq!(dsc.bg_color, Color::WHITE);
        assert_eq!(dsc.bg_opa, OPA_COVER);
        assert_eq!(dsc.border_width, 0);
        assert_eq!(dsc.shadow_width, 0);
        assert!(dsc.bg_img.is_none());
    }
}
