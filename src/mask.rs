// this_file: src/mask.rs
//! Radius masks and their rasterization into alpha coverage buffers.
//!
//! A [`MaskRasterizer`] keeps a stack of active masks. Dumping an area
//! multiplies the coverage of every active mask into one 8-bit buffer, which
//! the draw callers then upload as a texture. [`ZenoMasks`] is the CPU
//! implementation, rendering each rounded rectangle with `zeno`.

use image::GrayImage;
use log::trace;
use smallvec::SmallVec;
use zeno::{Command, Mask};

use crate::bufpool::PooledBuffer;
use crate::geometry::{Area, Coord};

/// Cubic Bézier handle length for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

/// Owned 8-bit coverage buffer, rows packed without padding.
#[derive(Debug)]
pub struct AlphaBuffer {
    width: u32,
    height: u32,
    data: PooledBuffer,
}

impl AlphaBuffer {
    /// Zeroed buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: PooledBuffer::new(width as usize * height as usize),
        }
    }

    /// Buffer filled with `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        let mut buf = Self::new(width, height);
        buf.data.iter_mut().for_each(|px| *px = value);
        buf
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> u32 {
        self.width
    }

    /// Coverage bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable coverage bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Coverage at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }
}

/// Rounded-rectangle coverage constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiusMask {
    /// Covered area
    pub area: Area,
    /// Corner radius (clamped to half the shorter side)
    pub radius: Coord,
    /// Keep the outside instead of the inside
    pub inverted: bool,
}

impl RadiusMask {
    /// Build a radius mask over `area`.
    pub fn new(area: Area, radius: Coord, inverted: bool) -> Self {
        let radius = radius.clamp(0, (area.short_side() / 2).max(0));
        Self {
            area,
            radius,
            inverted,
        }
    }
}

/// Handle of an active mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskId(u32);

/// Stack of active masks that can be dumped into coverage buffers.
pub trait MaskRasterizer {
    /// Activate a mask.
    fn add_mask(&mut self, mask: RadiusMask) -> MaskId;

    /// Deactivate a mask, returning it if it was active.
    fn remove_mask(&mut self, id: MaskId) -> Option<RadiusMask>;

    /// Number of active masks.
    fn active_count(&self) -> usize;

    /// Combined coverage of all active masks over `area`.
    fn dump(&mut self, area: &Area) -> AlphaBuffer;

    /// Blur a coverage buffer in place.
    fn blur(&mut self, buffer: &mut AlphaBuffer, radius: u32);

    /// Run `f` with `masks` active, removing them afterwards.
    fn with_masks<T>(&mut self, masks: &[RadiusMask], f: impl FnOnce(&mut Self) -> T) -> T
    where
        Self: Sized,
    {
        let ids: SmallVec<[MaskId; 2]> = masks.iter().map(|mask| self.add_mask(*mask)).collect();
        let out = f(self);
        for id in ids.into_iter().rev() {
            self.remove_mask(id);
        }
        out
    }
}

/// CPU mask rasterizer backed by `zeno`.
#[derive(Debug, Default)]
pub struct ZenoMasks {
    active: Vec<(MaskId, RadiusMask)>,
    next_id: u32,
}

impl ZenoMasks {
    /// Empty mask stack.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MaskRasterizer for ZenoMasks {
    fn add_mask(&mut self, mask: RadiusMask) -> MaskId {
        let id = MaskId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.active.push((id, mask));
        id
    }

    fn remove_mask(&mut self, id: MaskId) -> Option<RadiusMask> {
        let idx = self.active.iter().position(|(active, _)| *active == id)?;
        Some(self.active.remove(idx).1)
    }

    fn active_count(&self) -> usize {
        self.active.len()
    }

    fn dump(&mut self, area: &Area) -> AlphaBuffer {
        let width = area.width().max(0) as u32;
        let height = area.height().max(0) as u32;
        let mut out = AlphaBuffer::filled(width, height, 0xFF);
        if width == 0 || height == 0 {
            return out;
        }

        for (_, mask) in &self.active {
            let coverage = render_radius_mask(mask, area, width, height);
            for (dst, &cov) in out.data_mut().iter_mut().zip(coverage.iter()) {
                let cov = if mask.inverted { 0xFF - cov } else { cov };
                *dst = ((*dst as u16 * cov as u16 + 127) / 255) as u8;
            }
        }

        trace!(
            "Dumped {}x{} coverage through {} mask(s)",
            width,
            height,
            self.active.len()
        );
        out
    }

    fn blur(&mut self, buffer: &mut AlphaBuffer, radius: u32) {
        if radius == 0 || buffer.width() == 0 || buffer.height() == 0 {
            return;
        }
        let Some(gray) = GrayImage::from_raw(buffer.width(), buffer.height(), buffer.data().to_vec())
        else {
            return;
        };
        let blurred = image::imageops::blur(&gray, radius as f32 / 2.0);
        buffer.data_mut().copy_from_slice(blurred.as_raw());
    }
}

/// Rasterize one mask's rounded rectangle into `area`-local coverage.
fn render_radius_mask(mask: &RadiusMask, area: &Area, width: u32, height: u32) -> Vec<u8> {
    if mask.area.is_empty() {
        return vec![0; width as usize * height as usize];
    }
    let path = rounded_rect_path(
        (mask.area.x1 - area.x1) as f32,
        (mask.area.y1 - area.y1) as f32,
        mask.area.width() as f32,
        mask.area.height() as f32,
        mask.radius as f32,
    );
    let (coverage, _placement) = Mask::new(&path).size(width, height).render();
    coverage
}

/// Closed rounded-rectangle outline with quarter-circle corners.
fn rounded_rect_path(x: f32, y: f32, w: f32, h: f32, r: f32) -> Vec<Command> {
    let (right, bottom) = (x + w, y + h);
    if r <= 0.0 {
        return vec![
            Command::MoveTo((x, y).into()),
            Command::LineTo((right, y).into()),
            Command::LineTo((right, bottom).into()),
            Command::LineTo((x, bottom).into()),
            Command::Close,
        ];
    }

    let k = r * KAPPA;
    vec![
        Command::MoveTo((x + r, y).into()),
        Command::LineTo((right - r, y).into()),
        Command::CurveTo(
            (right - r + k, y).into(),
            (right, y + r - k).into(),
            (right, y + r).into(),
        ),
        Command::LineTo((right, bottom - r).into()),
        Command::CurveTo(
            (right, bottom - r + k).into(),
            (right - r + k, bottom).into(),
            (right - r, bottom).into(),
        ),
        Command::LineTo((x + r, bottom).into()),
        Command::CurveTo(
            (x + r - k, bottom).into(),
            (x, bottom - r + k).into(),
            (x, bottom - r).into(),
        ),
        Command::LineTo((x, y + r).into()),
        Command::CurveTo((x, y + r - k).into(), (x + r - k, y).into(), (x + r, y).into()),
        Command::Close,
    ]
}
