// this_file: src/font.rs

//! Bitmap fonts with packed 1/2/4/8 bpp glyph images.
//!
//! A [`BitmapFont`] is a table of glyph descriptors plus one packed bitmap.
//! Code points reach descriptors through character maps; only contiguous
//! (`Format0Tiny`) maps can be baked into an atlas. Fonts can be built by
//! hand or baked from a TrueType/OpenType file with [`BitmapFont::from_ttf`],
//! which rasterizes outlines through `skrifa` and `zeno`.

use std::fs::File;
use std::path::Path;

use log::{debug, info, warn};
use memmap2::Mmap;
use read_fonts::{FileRef, FontRef};
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::MetadataProvider;
use zeno::{Command, Mask, Transform};

use crate::error::{Error, Result};
use crate::geometry::Coord;
use crate::mask::AlphaBuffer;

/// Opacity of each 1 bpp value.
pub const BPP1_OPA: [u8; 2] = [0, 255];

/// Opacity of each 2 bpp value.
pub const BPP2_OPA: [u8; 4] = [0, 85, 170, 255];

/// Opacity of each 4 bpp value.
pub const BPP4_OPA: [u8; 16] = [
    0, 17, 34, 51, 68, 85, 102, 119, 136, 153, 170, 187, 204, 221, 238, 255,
];

/// Opacity of each 8 bpp value.
pub const BPP8_OPA: [u8; 256] = identity_table();

const fn identity_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    table
}

/// Lookup table and value mask for a bit depth.
pub fn opa_table(bpp: u8) -> Option<(&'static [u8], u8)> {
    match bpp {
        1 => Some((&BPP1_OPA, 0x1)),
        2 => Some((&BPP2_OPA, 0x3)),
        4 => Some((&BPP4_OPA, 0xF)),
        8 => Some((&BPP8_OPA, 0xFF)),
        _ => None,
    }
}

/// How a character map turns code points into glyph ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmapKind {
    /// Contiguous range, glyph ids follow code points one to one.
    Format0Tiny,
    /// Sparse range; `unicode_list` holds code point offsets from
    /// `range_start` in ascending order.
    SparseTiny {
        /// Sorted offsets of the mapped code points
        unicode_list: Vec<u16>,
    },
}

/// One character map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharMap {
    /// First code point
    pub range_start: u32,
    /// Number of code points covered
    pub range_length: u16,
    /// Glyph id of the first mapped code point
    pub glyph_id_start: u16,
    /// Mapping kind
    pub kind: CmapKind,
}

impl CharMap {
    /// Glyph id for `letter`, if this map covers it.
    pub fn glyph_id(&self, letter: u32) -> Option<usize> {
        let offset = letter.checked_sub(self.range_start)?;
        if offset >= self.range_length as u32 {
            return None;
        }
        let index = match &self.kind {
            CmapKind::Format0Tiny => offset as usize,
            CmapKind::SparseTiny { unicode_list } => {
                let offset = u16::try_from(offset).ok()?;
                unicode_list.binary_search(&offset).ok()?
            }
        };
        Some(self.glyph_id_start as usize + index)
    }
}

/// Glyph descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphDsc {
    /// Byte offset of the glyph image in the font bitmap
    pub bitmap_index: u32,
    /// Advance width in pixels
    pub adv_w: u16,
    /// Image width
    pub box_w: u16,
    /// Image height
    pub box_h: u16,
    /// Left bearing
    pub ofs_x: i16,
    /// Distance from the baseline to the bottom of the image (y up)
    pub ofs_y: i16,
}

impl GlyphDsc {
    /// True when the glyph has no pixels (space, missing outline).
    pub fn is_empty(&self) -> bool {
        self.box_w == 0 || self.box_h == 0
    }
}

/// Parameters for baking a bitmap font from an outline font.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeOptions {
    /// Pixel size
    pub size: f32,
    /// First code point
    pub range_start: u32,
    /// Number of code points
    pub range_length: u16,
    /// Bits per pixel of the packed images (1, 2, 4 or 8)
    pub bpp: u8,
}

impl Default for BakeOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            range_start: 0x20,
            range_length: 95,
            bpp: 4,
        }
    }
}

/// Bitmap font.
#[derive(Debug, Clone)]
pub struct BitmapFont {
    line_height: Coord,
    base_line: Coord,
    bpp: u8,
    cmaps: Vec<CharMap>,
    glyphs: Vec<GlyphDsc>,
    bitmap: Vec<u8>,
}

impl BitmapFont {
    /// Assemble a font from its tables.
    ///
    /// Glyph id 0 is reserved, so `glyphs[0]` is never looked up by a
    /// character map.
    pub fn new(
        line_height: Coord,
        base_line: Coord,
        bpp: u8,
        cmaps: Vec<CharMap>,
        glyphs: Vec<GlyphDsc>,
        bitmap: Vec<u8>,
    ) -> Result<Self> {
        if opa_table(bpp).is_none() {
            return Err(Error::Font(format!("Unsupported bit depth {}", bpp)));
        }
        if line_height < 0 || base_line < 0 {
            return Err(Error::Font("Negative font metrics".to_string()));
        }
        for glyph in &glyphs {
            let bits = glyph.box_w as usize * glyph.box_h as usize * bpp as usize;
            let end = glyph.bitmap_index as usize + bits.div_ceil(8);
            if end > bitmap.len() {
                return Err(Error::Font(format!(
                    "Glyph image at {} overruns the {} byte bitmap",
                    glyph.bitmap_index,
                    bitmap.len()
                )));
            }
        }
        Ok(Self {
            line_height,
            base_line,
            bpp,
            cmaps,
            glyphs,
            bitmap,
        })
    }

    /// Bake a font from TrueType/OpenType data. Collections use their
    /// first face.
    pub fn from_ttf(data: &[u8], options: &BakeOptions) -> Result<Self> {
        let font = match FileRef::new(data)
            .map_err(|e| Error::Font(format!("Failed to parse font: {}", e)))?
        {
            FileRef::Font(font) => font,
            FileRef::Collection(collection) => collection
                .get(0)
                .map_err(|e| Error::Font(format!("Failed to open collection face: {}", e)))?,
        };
        Self::bake(&font, options)
    }

    fn bake(font: &FontRef, options: &BakeOptions) -> Result<Self> {
        if !(options.size.is_finite() && options.size > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Font size must be positive, got {}",
                options.size
            )));
        }
        let (_, mask) = opa_table(options.bpp)
            .ok_or_else(|| Error::Font(format!("Unsupported bit depth {}", options.bpp)))?;

        let size = Size::new(options.size);
        let location = LocationRef::default();
        let metrics = font.metrics(size, location);
        let line_height = (metrics.ascent - metrics.descent).ceil() as Coord;
        let base_line = (-metrics.descent).ceil().max(0.0) as Coord;

        let charmap = font.charmap();
        let advances = font.glyph_metrics(size, location);
        let outlines = font.outline_glyphs();

        let mut glyphs = vec![GlyphDsc::default()];
        let mut bitmap = Vec::new();
        for offset in 0..options.range_length as u32 {
            let letter = options.range_start + offset;
            let Some(glyph_id) = charmap.map(letter) else {
                glyphs.push(GlyphDsc::default());
                continue;
            };
            let adv_w = advances
                .advance_width(glyph_id)
                .unwrap_or(0.0)
                .round()
                .clamp(0.0, u16::MAX as f32) as u16;
            let mut dsc = GlyphDsc {
                bitmap_index: bitmap.len() as u32,
                adv_w,
                ..GlyphDsc::default()
            };

            if let Some(outline) = outlines.get(glyph_id) {
                let mut bounds = BoundsPen::new();
                let _ = outline.draw(DrawSettings::unhinted(size, location), &mut bounds);
                if let Some((x_min, y_min, x_max, y_max)) = bounds.bounds() {
                    let left = x_min.floor();
                    let bottom = y_min.floor();
                    let top = y_max.ceil();
                    let width = (x_max.ceil() - left) as u32;
                    let height = (top - bottom) as u32;

                    let mut pen = ZenoPen::default();
                    outline
                        .draw(DrawSettings::unhinted(size, location), &mut pen)
                        .map_err(|e| {
                            Error::Font(format!("Failed to draw U+{:04X}: {:?}", letter, e))
                        })?;
                    let (alpha, _placement) = Mask::new(&pen.commands)
                        .transform(Some(Transform::translation(-left, top)))
                        .size(width, height)
                        .render();

                    bitmap.extend(pack_alpha(&alpha, options.bpp, mask));
                    dsc.box_w = width as u16;
                    dsc.box_h = height as u16;
                    dsc.ofs_x = left as i16;
                    dsc.ofs_y = bottom as i16;
                }
            }
            glyphs.push(dsc);
        }

        debug!(
            "Baked {} glyphs at {}px ({} bpp, line height {}, {} bitmap bytes)",
            options.range_length,
            options.size,
            options.bpp,
            line_height,
            bitmap.len()
        );

        Self::new(
            line_height,
            base_line,
            options.bpp,
            vec![CharMap {
                range_start: options.range_start,
                range_length: options.range_length,
                glyph_id_start: 1,
                kind: CmapKind::Format0Tiny,
            }],
            glyphs,
            bitmap,
        )
    }

    /// Memory-map a font file and bake it.
    pub fn load<P: AsRef<Path>>(path: P, options: &BakeOptions) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| Error::InvalidFont {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| invalid(format!("Failed to open: {}", e)))?;
        // SAFETY: the mapping is read-only and does not outlive this call.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| invalid(format!("Failed to memory-map: {}", e)))?;
        if mmap.is_empty() {
            return Err(invalid("File is empty".to_string()));
        }

        let font = Self::from_ttf(&mmap, options).map_err(|e| invalid(e.to_string()))?;
        info!(
            "Loaded font {} at {}px ({} bytes mapped)",
            path.display(),
            options.size,
            mmap.len()
        );
        Ok(font)
    }

    /// Line height in pixels.
    pub fn line_height(&self) -> Coord {
        self.line_height
    }

    /// Distance from the bottom of the line to the baseline.
    pub fn base_line(&self) -> Coord {
        self.base_line
    }

    /// Bits per pixel of the glyph images.
    pub fn bpp(&self) -> u8 {
        self.bpp
    }

    /// Character maps in lookup order.
    pub fn cmaps(&self) -> &[CharMap] {
        &self.cmaps
    }

    /// Descriptor by glyph id.
    pub fn glyph(&self, glyph_id: usize) -> Option<&GlyphDsc> {
        self.glyphs.get(glyph_id)
    }

    /// Descriptor for a code point.
    pub fn glyph_dsc(&self, letter: u32) -> Option<&GlyphDsc> {
        let glyph_id = self
            .cmaps
            .iter()
            .find_map(|cmap| cmap.glyph_id(letter))?;
        if glyph_id == 0 {
            return None;
        }
        self.glyph(glyph_id)
    }

    /// Unpack a glyph image into `dest` with its top-left corner at `(x, y)`.
    ///
    /// Pixels falling outside `dest` are dropped.
    pub fn decode_glyph(&self, dsc: &GlyphDsc, dest: &mut AlphaBuffer, x: u32, y: u32) {
        let Some((table, mask)) = opa_table(self.bpp) else {
            return;
        };
        let (width, height) = (dest.width(), dest.height());
        let stride = dest.stride() as usize;
        let Some(src) = self.bitmap.get(dsc.bitmap_index as usize..) else {
            return;
        };
        let bpp = self.bpp as usize;

        for row in 0..dsc.box_h as u32 {
            let dy = y + row;
            if dy >= height {
                break;
            }
            for col in 0..dsc.box_w as u32 {
                let dx = x + col;
                if dx >= width {
                    break;
                }
                let bit = (row as usize * dsc.box_w as usize + col as usize) * bpp;
                let shift = 8 - bpp - bit % 8;
                let Some(&byte) = src.get(bit / 8) else {
                    return;
                };
                let value = (byte >> shift) & mask;
                dest.data_mut()[dy as usize * stride + dx as usize] = table[value as usize];
            }
        }
    }
}

/// Quantize 8-bit coverage and pack it MSB first at `bpp` bits per pixel.
pub fn pack_alpha(alpha: &[u8], bpp: u8, mask: u8) -> Vec<u8> {
    let bpp = bpp as usize;
    let mut packed = vec![0u8; (alpha.len() * bpp).div_ceil(8)];
    for (i, &a) in alpha.iter().enumerate() {
        let value = (a >> (8 - bpp)) & mask;
        let bit = i * bpp;
        packed[bit / 8] |= value << (8 - bpp - bit % 8);
    }
    packed
}

/// Glyph bounds in pixels, y up.
struct BoundsPen {
    min: (f32, f32),
    max: (f32, f32),
    has_points: bool,
}

impl BoundsPen {
    fn new() -> Self {
        Self {
            min: (f32::INFINITY, f32::INFINITY),
            max: (f32::NEG_INFINITY, f32::NEG_INFINITY),
            has_points: false,
        }
    }

    fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        let (x_min, y_min) = self.min;
        let (x_max, y_max) = self.max;
        (self.has_points && x_min < x_max && y_min < y_max).then_some((x_min, y_min, x_max, y_max))
    }

    fn update(&mut self, x: f32, y: f32) {
        self.min = (self.min.0.min(x), self.min.1.min(y));
        self.max = (self.max.0.max(x), self.max.1.max(y));
        self.has_points = true;
    }
}

impl OutlinePen for BoundsPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.update(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.update(x, y);
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.update(cx, cy);
        self.update(x, y);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.update(cx0, cy0);
        self.update(cx1, cy1);
        self.update(x, y);
    }

    fn close(&mut self) {}
}

/// Collects a skrifa outline as zeno commands with y pointing down.
#[derive(Default)]
struct ZenoPen {
    commands: Vec<Command>,
}

impl OutlinePen for ZenoPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(Command::MoveTo([x, -y].into()));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(Command::LineTo([x, -y].into()));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.commands
            .push(Command::QuadTo([cx0, -cy0].into(), [x, -y].into()));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.commands.push(Command::CurveTo(
            [cx0, -cy0].into(),
            [cx1, -cy1].into(),
            [x, -y].into(),
        ));
    }

    fn close(&mut self) {
        self.commands.push(Command::Close);
    }
}

/// Warn about a code point without a descriptor, unless it is one that is
/// expected to be missing (control characters, the dummy symbol, ZWNJ).
pub(crate) fn warn_missing_glyph(letter: u32) {
    if letter >= 0x20 && letter != 0xF8FF && letter != 0x200C {
        warn!("Glyph descriptor not found for U+{:04X}", letter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_glyph_font(bpp: u8, pixels: &[u8], w: u16, h: u16) -> BitmapFont {
        let (_, mask) = opa_table(bpp).expect("bpp");
        BitmapFont::new(
            10,
            2,
            bpp,
            vec![CharMap {
                range_start: 'A' as u32,
                range_length: 1,
                glyph_id_start: 1,
                kind: CmapKind::Format0Tiny,
            }],
            vec![
                GlyphDsc::default(),
                GlyphDsc {
                    bitmap_index: 0,
                    adv_w: w + 1,
                    box_w: w,
                    box_h: h,
                    ofs_x: 0,
                    ofs_y: 0,
                },
            ],
            pack_alpha(pixels, bpp, mask),
        )
        .expect("font")
    }

    #[test]
    fn opacity_tables_span_full_range() {
        for bpp in [1, 2, 4, 8] {
            let (table, mask) = opa_table(bpp).expect("table");
            assert_eq!(table.len(), mask as usize + 1);
            assert_eq!(table[0], 0);
            assert_eq!(table[mask as usize], 255);
        }
        assert!(opa_table(3).is_none());
    }

    #[test]
    fn two_bpp_decodes_every_level() {
        let font = one_glyph_font(2, &[0, 85, 170, 255], 4, 1);
        let dsc = *font.glyph_dsc('A' as u32).expect("glyph");
        let mut dest = AlphaBuffer::new(4, 1);
        font.decode_glyph(&dsc, &mut dest, 0, 0);
        assert_eq!(dest.data(), &[0, 85, 170, 255]);
    }

    #[test]
    fn one_bpp_rows_are_not_byte_aligned() {
        // 3x3 cross: rows continue mid-byte.
        let pixels = [0, 255, 0, 255, 255, 255, 0, 255, 0];
        let font = one_glyph_font(1, &pixels, 3, 3);
        let dsc = *font.glyph_dsc('A' as u32).expect("glyph");
        let mut dest = AlphaBuffer::new(5, 5);
        font.decode_glyph(&dsc, &mut dest, 1, 1);
        assert_eq!(dest.get(2, 1), 255);
        assert_eq!(dest.get(1, 1), 0);
        assert_eq!(dest.get(1, 2), 255);
        assert_eq!(dest.get(3, 3), 0);
        assert_eq!(dest.get(0, 0), 0);
    }

    #[test]
    fn four_bpp_quantizes_coverage() {
        let font = one_glyph_font(4, &[0x00, 0x88, 0xFF], 3, 1);
        let dsc = *font.glyph_dsc('A' as u32).expect("glyph");
        let mut dest = AlphaBuffer::new(3, 1);
        font.decode_glyph(&dsc, &mut dest, 0, 0);
        assert_eq!(dest.data(), &[0, 136, 255]);
    }

    #[test]
    fn decode_clips_to_destination() {
        let font = one_glyph_font(8, &[255; 4], 2, 2);
        let dsc = *font.glyph_dsc('A' as u32).expect("glyph");
        let mut dest = AlphaBuffer::new(3, 3);
        font.decode_glyph(&dsc, &mut dest, 2, 2);
        assert_eq!(dest.get(2, 2), 255);
        assert_eq!(dest.data().iter().filter(|&&px| px != 0).count(), 1);
    }

    #[test]
    fn sparse_cmap_lookup() {
        let cmap = CharMap {
            range_start: 0x100,
            range_length: 100,
            glyph_id_start: 5,
            kind: CmapKind::SparseTiny {
                unicode_list: vec![0, 7, 42],
            },
        };
        assert_eq!(cmap.glyph_id(0x100), Some(5));
        assert_eq!(cmap.glyph_id(0x107), Some(6));
        assert_eq!(cmap.glyph_id(0x12A), Some(7));
        assert_eq!(cmap.glyph_id(0x101), None);
        assert_eq!(cmap.glyph_id(0xFF), None);
        assert_eq!(cmap.glyph_id(0x200), None);
    }

    #[test]
    fn rejects_overrunning_bitmap_and_bad_depth() {
        let glyph = GlyphDsc {
            bitmap_index: 0,
            adv_w: 4,
            box_w: 4,
            box_h: 4,
            ofs_x: 0,
            ofs_y: 0,
        };
        assert!(BitmapFont::new(8, 2, 8, vec![], vec![glyph], vec![0; 15]).is_err());
        assert!(BitmapFont::new(8, 2, 8, vec![], vec![glyph], vec![0; 16]).is_ok());
        assert!(BitmapFont::new(8, 2, 3, vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn garbage_is_not_a_font() {
        assert!(BitmapFont::from_ttf(&[0u8; 64], &BakeOptions::default()).is_err());
        let options = BakeOptions {
            size: 0.0,
            ..BakeOptions::default()
        };
        assert!(BitmapFont::from_ttf(&[0u8; 64], &options).is_err());
    }

    #[test]
    fn missing_file_is_invalid_font() {
        let err = BitmapFont::load("/nonexistent/font.ttf", &BakeOptions::default())
            .expect_err("missing");
        assert!(matches!(err, Error::InvalidFont { .. }));
    }
}
