// this_file: src/draw/label.rs

//! Glyphs and single-style labels drawn from font atlases.

use std::sync::Arc;

use super::{prepare_blit, Renderer};
use crate::backend::Backend;
use crate::config::OPA_COVER;
use crate::font::{warn_missing_glyph, BitmapFont};
use crate::geometry::{Area, Color, Coord, Flip, Point, Rect};
use crate::mask::MaskRasterizer;

/// Label style.
#[derive(Debug, Clone)]
pub struct LabelDsc {
    /// Font to draw with
    pub font: Arc<BitmapFont>,
    /// Text colour
    pub color: Color,
    /// Opacity
    pub opa: u8,
    /// Extra space after every glyph
    pub letter_space: Coord,
    /// Extra space between lines
    pub line_space: Coord,
}

impl LabelDsc {
    /// Opaque black text with no extra spacing.
    pub fn new(font: Arc<BitmapFont>) -> Self {
        Self {
            font,
            color: Color::BLACK,
            opa: OPA_COVER,
            letter_space: 0,
            line_space: 0,
        }
    }
}

impl<B: Backend, M: MaskRasterizer> Renderer<B, M> {
    /// Draw one glyph with the top of its line at `pos`.
    pub fn draw_letter(
        &mut self,
        pos: Point,
        clip: &Area,
        font: &Arc<BitmapFont>,
        letter: u32,
        color: Color,
        opa: u8,
    ) {
        let Some(opa) = self.opacity.resolve(opa) else {
            return;
        };
        let Some(glyph) = font.glyph_dsc(letter).copied() else {
            warn_missing_glyph(letter);
            return;
        };
        if glyph.is_empty() {
            return;
        }

        let (box_w, box_h) = (glyph.box_w as Coord, glyph.box_h as Coord);
        let x = pos.x + glyph.ofs_x as Coord;
        let y = pos.y + (font.line_height() - font.base_line()) - box_h - glyph.ofs_y as Coord;
        if x + box_w < clip.x1 || x > clip.x2 || y + box_h < clip.y1 || y > clip.y2 {
            return;
        }

        let Self {
            backend, atlases, ..
        } = self;
        let atlas = atlases.lookup_or_bake(backend, font);
        if !atlas.is_supported() {
            return;
        }
        let (Some(texture), Some(src)) = (atlas.texture(), atlas.glyph_rect(letter)) else {
            return;
        };

        prepare_blit(backend, texture, color, opa, clip);
        backend.blit(texture, Some(src), Rect::new(x, y, box_w, box_h), Flip::NONE);
    }

    /// Draw `text` left to right from the top-left corner of `coords`,
    /// breaking lines on `\n`. Nothing outside `coords` is touched.
    pub fn draw_label(&mut self, coords: &Area, clip: &Area, dsc: &LabelDsc, text: &str) {
        let Some(clip) = coords.intersect(clip) else {
            return;
        };
        let font = &dsc.font;
        let line_height = font.line_height();

        let mut y = coords.y1;
        for line in text.split('\n') {
            if y > clip.y2 {
                break;
            }
            let mut x = coords.x1;
            for ch in line.chars() {
                if x > clip.x2 {
                    break;
                }
                let letter = ch as u32;
                self.draw_letter(Point::new(x, y), &clip, font, letter, dsc.color, dsc.opa);
                if let Some(glyph) = font.glyph_dsc(letter) {
                    x += glyph.adv_w as Coord + dsc.letter_space;
                }
            }
            y += line_height + dsc.line_space;
        }
    }
}
