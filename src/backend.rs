// this_file: src/backend.rs

//! The rendering device consumed by the cache and the draw callers.
//!
//! Textures are move-only handles: the cache entry (or atlas record) holding
//! one is its only owner, and giving it back to [`Backend::destroy_texture`]
//! consumes it, so a texture cannot be released twice.

use image::RgbaImage;

use crate::error::Result;
use crate::geometry::{BlendMode, Color, Flip, Rect};

/// Rendering device with texture creation and primitive compositing.
///
/// Modulation state (blend mode, colour, alpha) belongs to each texture and
/// persists until changed; callers set all of it before every blit.
pub trait Backend {
    /// Texture handle. Deliberately not `Clone`.
    type Texture;

    /// Create a white texture whose alpha channel comes from an 8-bit buffer.
    ///
    /// `stride` is the distance in bytes between rows of `alpha`.
    fn create_texture_from_alpha(
        &mut self,
        alpha: &[u8],
        width: u32,
        height: u32,
        stride: u32,
    ) -> Result<Self::Texture>;

    /// Create a texture from an RGBA surface.
    fn create_texture_from_surface(&mut self, surface: &RgbaImage) -> Result<Self::Texture>;

    /// Release a texture.
    fn destroy_texture(&mut self, texture: Self::Texture);

    /// Size of a texture in texels.
    fn texture_size(&self, texture: &Self::Texture) -> (u32, u32);

    /// Restrict subsequent blits and fills; `None` removes the clip.
    fn set_clip_rect(&mut self, clip: Option<Rect>);

    /// Blending used when `texture` is composited.
    fn set_blend_mode(&mut self, texture: &Self::Texture, mode: BlendMode);

    /// Multiply the texture's colour channels by `color`.
    fn set_color_mod(&mut self, texture: &Self::Texture, color: Color);

    /// Multiply the texture's alpha by `alpha`.
    fn set_alpha_mod(&mut self, texture: &Self::Texture, alpha: u8);

    /// Copy `src` (whole texture when `None`) stretched onto `dst`.
    fn blit(&mut self, texture: &Self::Texture, src: Option<Rect>, dst: Rect, flip: Flip);

    /// Alpha-blend a solid rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Color, opa: u8);
}

/// Bytes a texture of the given size occupies on the device (RGBA8).
pub fn texture_bytes(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_bytes_counts_rgba() {
        assert_eq!(texture_bytes(16, 8), 512);
        assert_eq!(texture_bytes(0, 8), 0);
    }
}
