// this_file: src/software.rs

//! CPU implementation of [`Backend`] compositing into an RGBA canvas.
//!
//! Besides drawing, it keeps counts of texture creations, destructions,
//! blits and fills. Callers and tests use them to check that every texture
//! handed to the cache is destroyed exactly once.

use image::{Rgba, RgbaImage};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::geometry::{BlendMode, Color, Flip, Rect};

/// Handle to a texture owned by a [`SoftwareBackend`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

impl TextureId {
    /// Numeric id, unique for the backend's lifetime.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct SoftTexture {
    pixels: RgbaImage,
    blend: BlendMode,
    color: Color,
    alpha: u8,
}

/// Operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    /// Textures created
    pub created: u64,
    /// Textures destroyed
    pub destroyed: u64,
    /// Texture blits issued
    pub blits: u64,
    /// Solid fills issued
    pub fills: u64,
}

/// Software rendering device.
#[derive(Debug)]
pub struct SoftwareBackend {
    canvas: RgbaImage,
    textures: FxHashMap<u32, SoftTexture>,
    next_id: u32,
    clip: Option<Rect>,
    stats: BackendStats,
    texture_limit: Option<usize>,
}

impl SoftwareBackend {
    /// Canvas of the given size cleared to `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(
                width,
                height,
                Rgba([background.r, background.g, background.b, 0xFF]),
            ),
            textures: FxHashMap::default(),
            next_id: 1,
            clip: None,
            stats: BackendStats::default(),
            texture_limit: None,
        }
    }

    /// Refuse to create more than `limit` live textures.
    pub fn with_texture_limit(mut self, limit: usize) -> Self {
        self.texture_limit = Some(limit);
        self
    }

    /// Rendered canvas.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Canvas pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.canvas.width() && y < self.canvas.height()).then(|| self.canvas.get_pixel(x, y).0)
    }

    /// Clear the canvas to `color`.
    pub fn clear(&mut self, color: Color) {
        for px in self.canvas.pixels_mut() {
            *px = Rgba([color.r, color.g, color.b, 0xFF]);
        }
    }

    /// Textures created and not yet destroyed.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Operation counters.
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Current clip rectangle.
    pub fn clip_rect(&self) -> Option<Rect> {
        self.clip
    }

    /// Encode the canvas as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.canvas.save(path.as_ref())?;
        Ok(())
    }

    fn register(&mut self, pixels: RgbaImage) -> Result<TextureId> {
        if let Some(limit) = self.texture_limit {
            if self.textures.len() >= limit {
                return Err(Error::Backend(format!(
                    "texture limit of {} reached",
                    limit
                )));
            }
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.textures.insert(
            id,
            SoftTexture {
                pixels,
                blend: BlendMode::Blend,
                color: Color::WHITE,
                alpha: 0xFF,
            },
        );
        self.stats.created += 1;
        Ok(TextureId(id))
    }

    /// Destination area after clipping to the clip rect and the canvas.
    fn visible(&self, rect: Rect) -> Option<Rect> {
        let bounds = Rect::new(0, 0, self.canvas.width() as i32, self.canvas.height() as i32);
        let rect = rect.intersect(&bounds)?;
        match self.clip {
            Some(clip) => rect.intersect(&clip),
            None => Some(rect),
        }
    }
}

impl Backend for SoftwareBackend {
    type Texture = TextureId;

    fn create_texture_from_alpha(
        &mut self,
        alpha: &[u8],
        width: u32,
        height: u32,
        stride: u32,
    ) -> Result<TextureId> {
        if width == 0 || height == 0 {
            return Err(Error::Backend(format!(
                "cannot create a {}x{} texture",
                width, height
            )));
        }
        let needed = (height as usize - 1) * stride as usize + width as usize;
        if stride < width || alpha.len() < needed {
            return Err(Error::Backend(format!(
                "alpha buffer of {} bytes too small for {}x{} (stride {})",
                alpha.len(),
                width,
                height,
                stride
            )));
        }
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([0xFF, 0xFF, 0xFF, alpha[(y * stride + x) as usize]])
        });
        self.register(pixels)
    }

    fn create_texture_from_surface(&mut self, surface: &RgbaImage) -> Result<TextureId> {
        if surface.width() == 0 || surface.height() == 0 {
            return Err(Error::Backend("cannot create a texture from an empty surface".into()));
        }
        self.register(surface.clone())
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.0).is_some() {
            self.stats.destroyed += 1;
        } else {
            log::error!("Destroying unknown texture {}", texture.0);
        }
    }

    fn texture_size(&self, texture: &TextureId) -> (u32, u32) {
        self.textures
            .get(&texture.0)
            .map(|tex| tex.pixels.dimensions())
            .unwrap_or((0, 0))
    }

    fn set_clip_rect(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    fn set_blend_mode(&mut self, texture: &TextureId, mode: BlendMode) {
        if let Some(tex) = self.textures.get_mut(&texture.0) {
            tex.blend = mode;
        }
    }

    fn set_color_mod(&mut self, texture: &TextureId, color: Color) {
        if let Some(tex) = self.textures.get_mut(&texture.0) {
            tex.color = color;
        }
    }

    fn set_alpha_mod(&mut self, texture: &TextureId, alpha: u8) {
        if let Some(tex) = self.textures.get_mut(&texture.0) {
            tex.alpha = alpha;
        }
    }

    fn blit(&mut self, texture: &TextureId, src: Option<Rect>, dst: Rect, flip: Flip) {
        self.stats.blits += 1;
        if dst.is_empty() {
            return;
        }
        let Some(visible) = self.visible(dst) else {
            return;
        };
        let Some(tex) = self.textures.get(&texture.0) else {
            log::error!("Blit from unknown texture {}", texture.0);
            return;
        };
        let (tw, th) = tex.pixels.dimensions();
        let src = src.unwrap_or(Rect::new(0, 0, tw as i32, th as i32));
        let Some(src) = src.intersect(&Rect::new(0, 0, tw as i32, th as i32)) else {
            return;
        };

        for y in visible.y..visible.y + visible.h {
            let mut v = y - dst.y;
            if flip.vertical {
                v = dst.h - 1 - v;
            }
            let sy = src.y + (v as i64 * src.h as i64 / dst.h as i64) as i32;
            for x in visible.x..visible.x + visible.w {
                let mut u = x - dst.x;
                if flip.horizontal {
                    u = dst.w - 1 - u;
                }
                let sx = src.x + (u as i64 * src.w as i64 / dst.w as i64) as i32;
                let texel = tex.pixels.get_pixel(sx as u32, sy as u32).0;
                let color = [
                    mul8(texel[0], tex.color.r),
                    mul8(texel[1], tex.color.g),
                    mul8(texel[2], tex.color.b),
                ];
                let alpha = mul8(texel[3], tex.alpha);
                let dst_px = self.canvas.get_pixel_mut(x as u32, y as u32);
                match tex.blend {
                    BlendMode::Blend => blend_over(dst_px, color, alpha),
                    BlendMode::None => *dst_px = Rgba([color[0], color[1], color[2], alpha]),
                }
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color, opa: u8) {
        self.stats.fills += 1;
        let Some(visible) = self.visible(rect) else {
            return;
        };
        for y in visible.y..visible.y + visible.h {
            for x in visible.x..visible.x + visible.w {
                let dst_px = self.canvas.get_pixel_mut(x as u32, y as u32);
                blend_over(dst_px, [color.r, color.g, color.b], opa);
            }
        }
    }
}

/// `a * b / 255`, rounded.
fn mul8(a: u8, b: u8) -> u8 {
    ((a as u16 * b as u16 + 127) / 255) as u8
}

/// Source-over blend of a non-premultiplied colour.
fn blend_over(dst: &mut Rgba<u8>, color: [u8; 3], alpha: u8) {
    if alpha == 0 {
        return;
    }
    let inv = 0xFF - alpha;
    for (channel, &src) in dst.0.iter_mut().take(3).zip(color.iter()) {
        *channel = ((src as u16 * alpha as u16 + *channel as u16 * inv as u16 + 127) / 255) as u8;
    }
    dst.0[3] = alpha.saturating_add(mul8(dst.0[3], inv));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_texture_modulated_by_color() {
        let mut backend = SoftwareBackend::new(4, 4, Color::WHITE);
        let tex = backend
            .create_texture_from_alpha(&[0xFF; 4], 2, 2, 2)
            .expect("texture created");
        backend.set_color_mod(&tex, Color::rgb(255, 0, 0));
        backend.set_alpha_mod(&tex, 0xFF);
        backend.blit(&tex, None, Rect::new(1, 1, 2, 2), Flip::NONE);
        assert_eq!(backend.pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(backend.pixel(0, 0), Some([255, 255, 255, 255]));
        backend.destroy_texture(tex);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.stats().destroyed, 1);
    }

    #[test]
    fn horizontal_flip_mirrors_columns() {
        let mut backend = SoftwareBackend::new(2, 1, Color::BLACK);
        let tex = backend
            .create_texture_from_alpha(&[0xFF, 0x00], 2, 1, 2)
            .expect("texture created");
        backend.blit(&tex, None, Rect::new(0, 0, 2, 1), Flip::HORIZONTAL);
        assert_eq!(backend.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(backend.pixel(1, 0), Some([255, 255, 255, 255]));
        backend.destroy_texture(tex);
    }

    #[test]
    fn clip_limits_fill() {
        let mut backend = SoftwareBackend::new(4, 4, Color::BLACK);
        backend.set_clip_rect(Some(Rect::new(0, 0, 2, 4)));
        backend.fill_rect(Rect::new(0, 0, 4, 4), Color::WHITE, 0xFF);
        assert_eq!(backend.pixel(1, 3), Some([255, 255, 255, 255]));
        assert_eq!(backend.pixel(2, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn stride_is_honoured() {
        let mut backend = SoftwareBackend::new(2, 2, Color::BLACK);
        let alpha = [0xFF, 0x00, 0x99, 0x00, 0xFF, 0x99];
        let tex = backend
            .create_texture_from_alpha(&alpha, 2, 2, 3)
            .expect("texture created");
        backend.blit(&tex, None, Rect::new(0, 0, 2, 2), Flip::NONE);
        assert_eq!(backend.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(backend.pixel(1, 0), Some([0, 0, 0, 255]));
        assert_eq!(backend.pixel(1, 1), Some([255, 255, 255, 255]));
        backend.destroy_texture(tex);
    }

    #[test]
    fn rejects_undersized_buffers_and_limits() {
        let mut backend = SoftwareBackend::new(2, 2, Color::BLACK).with_texture_limit(1);
        assert!(backend.create_texture_from_alpha(&[0; 3], 2, 2, 2).is_err());
        assert!(backend.create_texture_from_alpha(&[], 0, 0, 0).is_err());
        let tex = backend
            .create_texture_from_alpha(&[0; 4], 2, 2, 2)
            .expect("first texture fits");
        assert!(matches!(
            backend.create_texture_from_alpha(&[0; 4], 2, 2, 2),
            Err(Error::Backend(_))
        ));
        backend.destroy_texture(tex);
    }

    #[test]
    fn half_alpha_blends() {
        let mut backend = SoftwareBackend::new(1, 1, Color::BLACK);
        backend.fill_rect(Rect::new(0, 0, 1, 1), Color::WHITE, 128);
        let px = backend.pixel(0, 0).expect("inside canvas");
        approx::assert_abs_diff_eq!(px[0] as f32, 128.0, epsilon = 1.0);
    }
}
