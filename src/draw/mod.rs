// this_file: src/draw/mod.rs

//! Shape and text drawing on top of the texture cache.
//!
//! Every cached draw runs the same steps: build a position-independent key,
//! look it up, rasterize masks into a texture on a miss and store it, then
//! composite the texture with the caller's colour, opacity and clip.

mod label;
mod rect;

pub use label::LabelDsc;
pub use rect::{BgImage, BorderSide, RectDsc, RADIUS_CIRCLE};

use log::{debug, error};

use crate::atlas::FontAtlasRegistry;
use crate::backend::Backend;
use crate::config::{CacheConfig, Capacity, OpacityThresholds};
use crate::draw_cache::DrawCache;
use crate::geometry::{Area, BlendMode, Color};
use crate::key::CacheKey;
use crate::mask::{AlphaBuffer, MaskRasterizer, ZenoMasks};

/// Drawing service owning a backend, a mask rasterizer, the texture cache and
/// the font atlases.
///
/// Several renderers can coexist; nothing is shared between them. Call
/// [`Renderer::shutdown`] to release every texture and get the backend back.
pub struct Renderer<B: Backend, M: MaskRasterizer = ZenoMasks> {
    backend: B,
    masks: M,
    cache: DrawCache<B::Texture>,
    atlases: FontAtlasRegistry<B::Texture>,
    opacity: OpacityThresholds,
}

impl<B: Backend> Renderer<B, ZenoMasks> {
    /// Renderer with the CPU mask rasterizer.
    pub fn new(backend: B, config: CacheConfig) -> Self {
        Self::with_masks(backend, ZenoMasks::new(), config)
    }
}

impl<B: Backend, M: MaskRasterizer> Renderer<B, M> {
    /// Renderer with a caller-provided mask rasterizer.
    pub fn with_masks(backend: B, masks: M, config: CacheConfig) -> Self {
        Self {
            backend,
            masks,
            cache: DrawCache::init(config),
            atlases: FontAtlasRegistry::new(),
            opacity: OpacityThresholds::default(),
        }
    }

    /// Replace the opacity policy.
    pub fn with_opacity(mut self, opacity: OpacityThresholds) -> Self {
        self.opacity = opacity;
        self
    }

    /// Device the renderer draws on.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable device, for presenting or reading back.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Mask stack.
    pub fn masks(&self) -> &M {
        &self.masks
    }

    /// Mask stack; masks left active here route backgrounds through the
    /// uncached path.
    pub fn masks_mut(&mut self) -> &mut M {
        &mut self.masks
    }

    /// Shape texture cache.
    pub fn cache(&self) -> &DrawCache<B::Texture> {
        &self.cache
    }

    /// Baked font atlases.
    pub fn atlases(&self) -> &FontAtlasRegistry<B::Texture> {
        &self.atlases
    }

    /// Current opacity policy.
    pub fn opacity(&self) -> OpacityThresholds {
        self.opacity
    }

    /// Change the cache bound, destroying textures that no longer fit.
    pub fn set_cache_capacity(&mut self, capacity: Capacity) {
        self.cache.set_capacity(&mut self.backend, capacity);
    }

    /// Release every cached texture and atlas and return the backend.
    pub fn shutdown(self) -> B {
        let Self {
            mut backend,
            cache,
            mut atlases,
            ..
        } = self;
        let stats = cache.stats();
        cache.shutdown(&mut backend);
        atlases.clear(&mut backend);
        debug!(
            "Renderer shut down ({} hits, {} misses, {} evictions)",
            stats.hits, stats.misses, stats.evictions
        );
        backend
    }
}

/// Cached texture for `key`, created with `create` and stored on a miss.
fn cached_texture<'a, B: Backend>(
    backend: &mut B,
    cache: &'a mut DrawCache<B::Texture>,
    key: CacheKey,
    create: impl FnOnce(&mut B) -> Option<B::Texture>,
) -> Option<&'a B::Texture> {
    if cache.get_cached(&key).is_some() {
        return cache.peek(&key);
    }
    debug!("Rasterizing {:?}", key);
    let texture = create(backend)?;
    Some(cache.put_cached(backend, key, texture))
}

/// Cached mask texture for `key`, rasterized by `rasterize` on a miss.
fn cached_mask_texture<'a, B: Backend, M: MaskRasterizer>(
    backend: &mut B,
    masks: &mut M,
    cache: &'a mut DrawCache<B::Texture>,
    key: CacheKey,
    rasterize: impl FnOnce(&mut M) -> AlphaBuffer,
) -> Option<&'a B::Texture> {
    cached_texture(backend, cache, key, |backend| {
        let alpha = rasterize(masks);
        upload_alpha(backend, &alpha)
    })
}

/// Upload a coverage buffer; failures are logged and yield `None`.
fn upload_alpha<B: Backend>(backend: &mut B, alpha: &AlphaBuffer) -> Option<B::Texture> {
    match backend.create_texture_from_alpha(alpha.data(), alpha.width(), alpha.height(), alpha.stride())
    {
        Ok(texture) => Some(texture),
        Err(e) => {
            error!(
                "Failed to create {}x{} mask texture: {}",
                alpha.width(),
                alpha.height(),
                e
            );
            None
        }
    }
}

/// Set the full modulation state of `texture` and the clip for the next blit.
fn prepare_blit<B: Backend>(backend: &mut B, texture: &B::Texture, color: Color, opa: u8, clip: &Area) {
    backend.set_blend_mode(texture, BlendMode::Blend);
    backend.set_color_mod(texture, color);
    backend.set_alpha_mod(texture, opa);
    backend.set_clip_rect(Some(clip.to_rect()));
}
