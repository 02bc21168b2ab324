// this_file: src/atlas.rs

//! Per-font glyph atlases.
//!
//! The first time a font is drawn its contiguous character range is decoded
//! into one alpha sprite and uploaded as a single texture. Atlases are keyed
//! by font identity and live until the registry is cleared; they never compete
//! with shape textures for space in the draw cache.

use std::sync::Arc;

use log::{debug, error, warn};
use rustc_hash::FxHashMap;

use crate::backend::Backend;
use crate::font::{BitmapFont, CmapKind};
use crate::geometry::Rect;
use crate::mask::AlphaBuffer;

/// Glyph columns per atlas row.
pub const ATLAS_COLUMNS: i32 = 16;

/// Largest character range an atlas can hold.
pub const ATLAS_MAX_RANGE: u16 = 256;

/// Font identity: the address of the shared font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(usize);

impl FontId {
    /// Identity of `font`.
    pub fn of(font: &Arc<BitmapFont>) -> Self {
        Self(Arc::as_ptr(font) as usize)
    }
}

/// Atlas baked for one font.
#[derive(Debug)]
pub struct AtlasRecord<T> {
    font: Arc<BitmapFont>,
    supported: bool,
    texture: Option<T>,
    rects: Vec<Rect>,
    start: u32,
}

impl<T> AtlasRecord<T> {
    fn unsupported(font: Arc<BitmapFont>) -> Self {
        Self {
            font,
            supported: false,
            texture: None,
            rects: Vec::new(),
            start: 0,
        }
    }

    /// The font this atlas was baked from.
    pub fn font(&self) -> &Arc<BitmapFont> {
        &self.font
    }

    /// False when the font has no bakeable character map.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Atlas texture.
    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }

    /// First code point in the atlas.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Sprite rectangle of every code point in the range, in order.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Sprite rectangle of `letter`, if it lies in the atlas range.
    pub fn glyph_rect(&self, letter: u32) -> Option<Rect> {
        let index = letter.checked_sub(self.start)?;
        self.rects.get(index as usize).copied()
    }
}

/// Unbounded registry of glyph atlases.
#[derive(Debug)]
pub struct FontAtlasRegistry<T> {
    atlases: FxHashMap<FontId, AtlasRecord<T>>,
}

impl<T> Default for FontAtlasRegistry<T> {
    fn default() -> Self {
        Self {
            atlases: FxHashMap::default(),
        }
    }
}

impl<T> FontAtlasRegistry<T> {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    /// True when no font has been baked yet.
    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    /// Atlas of `font`, if already baked.
    pub fn get(&self, font: &Arc<BitmapFont>) -> Option<&AtlasRecord<T>> {
        self.atlases.get(&FontId::of(font))
    }

    /// Atlas of `font`, baking it on first use.
    pub fn lookup_or_bake<B>(&mut self, backend: &mut B, font: &Arc<BitmapFont>) -> &AtlasRecord<T>
    where
        B: Backend<Texture = T>,
    {
        self.atlases
            .entry(FontId::of(font))
            .or_insert_with(|| bake(backend, font))
    }

    /// Destroy every atlas texture.
    pub fn clear<B>(&mut self, backend: &mut B)
    where
        B: Backend<Texture = T>,
    {
        let count = self.atlases.len();
        for (_, record) in self.atlases.drain() {
            if let Some(texture) = record.texture {
                backend.destroy_texture(texture);
            }
        }
        if count > 0 {
            debug!("Released {} font atlas(es)", count);
        }
    }
}

impl<T> Drop for FontAtlasRegistry<T> {
    fn drop(&mut self) {
        let leaked = self
            .atlases
            .values()
            .filter(|record| record.texture.is_some())
            .count();
        if leaked > 0 {
            warn!("Font atlas registry dropped without clear; {} texture(s) leaked", leaked);
        }
    }
}

/// Sprite placement of a character range: one rectangle per code point and
/// the sprite size.
///
/// Rows wrap on accumulated glyph width, so the sprite is as tall as the
/// rows actually used (at least one line).
pub fn pack_glyphs(font: &BitmapFont, glyph_id_start: u16, range_length: u16) -> (Vec<Rect>, u32, u32) {
    let line_height = font.line_height();
    let sprite_w = line_height * ATLAS_COLUMNS;

    let mut rects = Vec::with_capacity(range_length as usize);
    let (mut x, mut y) = (0, 0);
    for i in 0..range_length as usize {
        let dsc = font
            .glyph(glyph_id_start as usize + i)
            .copied()
            .unwrap_or_default();
        let (box_w, box_h) = (dsc.box_w as i32, dsc.box_h as i32);
        if x + box_w >= sprite_w {
            x = 0;
            y += line_height;
        }
        rects.push(Rect::new(x, y, box_w, box_h));
        if box_w > 0 && box_h > 0 {
            x += box_w;
        }
    }
    let sprite_h = rects
        .iter()
        .map(|rect| rect.y + rect.h)
        .fold(y + line_height, i32::max);
    (rects, sprite_w.max(0) as u32, sprite_h.max(0) as u32)
}

fn bake<B: Backend>(backend: &mut B, font: &Arc<BitmapFont>) -> AtlasRecord<B::Texture> {
    let Some(cmap) = font.cmaps().iter().find(|c| c.kind == CmapKind::Format0Tiny) else {
        warn!("Font has no contiguous character map; glyphs will not be drawn");
        return AtlasRecord::unsupported(Arc::clone(font));
    };
    if cmap.range_length > ATLAS_MAX_RANGE {
        warn!(
            "Character range of {} code points does not fit an atlas; glyphs will not be drawn",
            cmap.range_length
        );
        return AtlasRecord::unsupported(Arc::clone(font));
    }

    let (rects, sprite_w, sprite_h) = pack_glyphs(font, cmap.glyph_id_start, cmap.range_length);
    if sprite_w == 0 || sprite_h == 0 {
        warn!("Font has zero line height; glyphs will not be drawn");
        return AtlasRecord::unsupported(Arc::clone(font));
    }

    let mut sprite = AlphaBuffer::new(sprite_w, sprite_h);
    for (i, rect) in rects.iter().enumerate() {
        if rect.is_empty() {
            continue;
        }
        if let Some(dsc) = font.glyph(cmap.glyph_id_start as usize + i) {
            font.decode_glyph(dsc, &mut sprite, rect.x as u32, rect.y as u32);
        }
    }

    match backend.create_texture_from_alpha(sprite.data(), sprite_w, sprite_h, sprite.stride()) {
        Ok(texture) => {
            debug!(
                "Baked {}x{} atlas for U+{:04X}..+{}",
                sprite_w, sprite_h, cmap.range_start, cmap.range_length
            );
            AtlasRecord {
                font: Arc::clone(font),
                supported: true,
                texture: Some(texture),
                rects,
                start: cmap.range_start,
            }
        }
        Err(e) => {
            error!("Failed to create font atlas texture: {}", e);
            AtlasRecord::unsupported(Arc::clone(font))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{CharMap, GlyphDsc};
    use crate::geometry::Color;
    use crate::software::SoftwareBackend;

    fn block_font(line_height: i32, box_w: u16, count: u16, kind: CmapKind) -> Arc<BitmapFont> {
        let glyph = GlyphDsc {
            bitmap_index: 0,
            adv_w: box_w,
            box_w,
            box_h: line_height as u16,
            ofs_x: 0,
            ofs_y: 0,
        };
        let mut glyphs = vec![GlyphDsc::default()];
        glyphs.extend(std::iter::repeat(glyph).take(count as usize));
        let bitmap = vec![0xFF; box_w as usize * line_height as usize];
        Arc::new(
            BitmapFont::new(
                line_height,
                0,
                8,
                vec![CharMap {
                    range_start: 0x41,
                    range_length: count,
                    glyph_id_start: 1,
                    kind,
                }],
                glyphs,
                bitmap,
            )
            .expect("font"),
        )
    }

    #[test]
    fn packing_wraps_when_glyph_reaches_edge() {
        // sprite is 4 * 16 = 64 wide; 16 px glyphs fit three per row
        // because the fourth would end exactly on the edge.
        let font = block_font(4, 16, 5, CmapKind::Format0Tiny);
        let (rects, w, h) = pack_glyphs(&font, 1, 5);
        assert_eq!((w, h), (64, 8));
        assert_eq!(rects[0], Rect::new(0, 0, 16, 4));
        assert_eq!(rects[2], Rect::new(32, 0, 16, 4));
        assert_eq!(rects[3], Rect::new(0, 4, 16, 4));
        assert_eq!(rects[4], Rect::new(16, 4, 16, 4));
    }

    #[test]
    fn bake_once_per_font() {
        let mut backend = SoftwareBackend::new(16, 16, Color::BLACK);
        let mut registry = FontAtlasRegistry::new();
        let font = block_font(8, 4, 3, CmapKind::Format0Tiny);

        let record = registry.lookup_or_bake(&mut backend, &font);
        assert!(record.is_supported());
        assert_eq!(record.start(), 0x41);
        assert_eq!(record.glyph_rect(0x42), Some(Rect::new(4, 0, 4, 8)));
        assert_eq!(record.glyph_rect(0x44), None);
        assert_eq!(record.glyph_rect(0x40), None);

        registry.lookup_or_bake(&mut backend, &font);
        assert_eq!(registry.len(), 1);
        assert_eq!(backend.stats().created, 1);

        registry.clear(&mut backend);
        assert_eq!(backend.live_textures(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn wide_glyph_rows_stay_inside_the_sprite() {
        // 8 px glyphs in a 64 px sprite wrap after seven, so sixteen
        // glyphs take three rows.
        let font = block_font(4, 8, 16, CmapKind::Format0Tiny);
        let (rects, w, h) = pack_glyphs(&font, 1, 16);
        assert_eq!((w, h), (64, 12));
        assert_eq!(rects[7], Rect::new(0, 4, 8, 4));
        assert_eq!(rects[15], Rect::new(8, 8, 8, 4));
        assert!(rects.iter().all(|r| r.y + r.h <= h as i32));

        let mut backend = SoftwareBackend::new(16, 16, Color::BLACK);
        let mut registry = FontAtlasRegistry::new();
        let record = registry.lookup_or_bake(&mut backend, &font);
        let texture = record.texture().expect("atlas texture");
        assert_eq!(backend.texture_size(texture), (64, 12));
        registry.clear(&mut backend);
    }

    #[test]
    fn sparse_font_is_unsupported() {
        let mut backend = SoftwareBackend::new(16, 16, Color::BLACK);
        let mut registry = FontAtlasRegistry::new();
        let font = block_font(8, 4, 3, CmapKind::SparseTiny {
            unicode_list: vec![0, 1, 2],
        });
        let record = registry.lookup_or_bake(&mut backend, &font);
        assert!(!record.is_supported());
        assert!(record.texture().is_none());
        assert_eq!(backend.stats().created, 0);
        registry.clear(&mut backend);
    }

    #[test]
    fn oversized_range_is_unsupported() {
        let mut backend = SoftwareBackend::new(16, 16, Color::BLACK);
        let mut registry = FontAtlasRegistry::new();
        let font = block_font(2, 1, 300, CmapKind::Format0Tiny);
        assert!(!registry.lookup_or_bake(&mut backend, &font).is_supported());
        registry.clear(&mut backend);
    }

    #[test]
    fn distinct_fonts_get_distinct_atlases() {
        let mut backend = SoftwareBackend::new(16, 16, Color::BLACK);
        let mut registry = FontAtlasRegistry::new();
        let a = block_font(8, 4, 2, CmapKind::Format0Tiny);
        let b = Arc::new((*a).clone());
        registry.lookup_or_bake(&mut backend, &a);
        registry.lookup_or_bake(&mut backend, &b);
        registry.lookup_or_bake(&mut backend, &Arc::clone(&a));
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&a).is_some());
        registry.clear(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }
}
