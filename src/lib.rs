// this_file: src/lib.rs
//! drawcache - LRU texture cache for rasterized shapes and glyph atlases
//!
//! Rounded backgrounds, shadows, borders and outlines are rasterized once
//! through a mask rasterizer, uploaded as textures and reused on later frames
//! until the least recently used ones are evicted. Bitmap fonts are baked into
//! one atlas texture per font.
//!
//! - [`key`]: canonical byte keys for cached shapes
//! - [`lru`]: bounded store that releases what it evicts
//! - [`draw_cache`]: the store bound to a backend's textures
//! - [`draw`]: the [`Renderer`] and its shape and text drawers
//! - [`atlas`]: per-font glyph atlases
//! - [`software`] and [`mask::ZenoMasks`]: CPU implementations of the
//!   [`Backend`] and [`MaskRasterizer`] traits

pub mod atlas;
pub mod backend;
pub mod bufpool;
pub mod config;
pub mod draw;
pub mod draw_cache;
pub mod error;
pub mod font;
pub mod geometry;
pub mod key;
pub mod logging;
pub mod lru;
pub mod mask;
pub mod scene;
pub mod software;

// Re-export commonly used types
pub use atlas::{AtlasRecord, FontAtlasRegistry};
pub use backend::Backend;
pub use config::{CacheConfig, Capacity, OpacityThresholds};
pub use draw::{BgImage, BorderSide, LabelDsc, RectDsc, Renderer, RADIUS_CIRCLE};
pub use draw_cache::{CacheStats, DrawCache};
pub use error::{Error, Result};
pub use font::{BakeOptions, BitmapFont};
pub use geometry::{Area, Color, Point, Rect};
pub use key::{key_equals, key_hash, CacheKey, KeyBuilder, KeyMagic, ShapeKey};
pub use lru::{Entry, LruStore, Payload};
pub use mask::{AlphaBuffer, MaskRasterizer, RadiusMask, ZenoMasks};
pub use software::SoftwareBackend;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
