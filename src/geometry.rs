// this_file: src/geometry.rs

//! Areas, rectangles and colours shared by the backend and the draw callers.
//!
//! `Area` uses inclusive corners (`x2`/`y2` are the last covered pixel), the
//! way widget coordinates arrive. `Rect` is the origin + size form the
//! backend consumes.

use serde::{Deserialize, Serialize};

/// Signed pixel coordinate.
pub type Coord = i32;

/// Inclusive pixel area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    /// Left edge
    pub x1: Coord,
    /// Top edge
    pub y1: Coord,
    /// Right edge (inclusive)
    pub x2: Coord,
    /// Bottom edge (inclusive)
    pub y2: Coord,
}

impl Area {
    /// Create an area from inclusive corners.
    pub const fn new(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Area of the given size with its top-left corner at `(x, y)`.
    pub const fn from_origin_size(x: Coord, y: Coord, w: Coord, h: Coord) -> Self {
        Self::new(x, y, x + w - 1, y + h - 1)
    }

    /// Width in pixels (zero or negative for empty areas).
    pub const fn width(&self) -> Coord {
        self.x2 - self.x1 + 1
    }

    /// Height in pixels (zero or negative for empty areas).
    pub const fn height(&self) -> Coord {
        self.y2 - self.y1 + 1
    }

    /// True when the area covers no pixel.
    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Shorter of width and height.
    pub fn short_side(&self) -> Coord {
        self.width().min(self.height())
    }

    /// Common part of two areas, `None` when they do not overlap.
    pub fn intersect(&self, other: &Area) -> Option<Area> {
        let area = Area::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        (!area.is_empty()).then_some(area)
    }

    /// Move the area by `(dx, dy)`.
    pub const fn translate(&self, dx: Coord, dy: Coord) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// Grow (or shrink, for negative values) every side by `d`.
    pub const fn grow(&self, d: Coord) -> Self {
        Self::new(self.x1 - d, self.y1 - d, self.x2 + d, self.y2 + d)
    }

    /// Same size, top-left corner at the origin.
    pub const fn at_origin(&self) -> Self {
        self.translate(-self.x1, -self.y1)
    }

    /// True when the pixel lies inside the area.
    pub const fn contains(&self, x: Coord, y: Coord) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Backend rectangle covering the same pixels.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x1, self.y1, self.width().max(0), self.height().max(0))
    }
}

/// Pixel position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position
    pub x: Coord,
    /// Vertical position
    pub y: Coord,
}

impl Point {
    /// Create a point.
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }
}

/// Origin + size rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: Coord,
    /// Top edge
    pub y: Coord,
    /// Width
    pub w: Coord,
    /// Height
    pub h: Coord,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: Coord, y: Coord, w: Coord, h: Coord) -> Self {
        Self { x, y, w, h }
    }

    /// True when the rectangle covers no pixel.
    pub const fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Common part of two rectangles.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);
        let rect = Rect::new(x1, y1, x2 - x1, y2 - y1);
        (!rect.is_empty()).then_some(rect)
    }
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Color {
    /// Black
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// White
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Create a colour from components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Texture blending used when compositing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite destination texels.
    None,
    /// Standard source-over alpha blending.
    #[default]
    Blend,
}

/// Mirroring applied to a blit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flip {
    /// Mirror left/right
    pub horizontal: bool,
    /// Mirror top/bottom
    pub vertical: bool,
}

impl Flip {
    /// No mirroring.
    pub const NONE: Flip = Flip {
        horizontal: false,
        vertical: false,
    };
    /// Mirror left/right.
    pub const HORIZONTAL: Flip = Flip {
        horizontal: true,
        vertical: false,
    };
    /// Mirror top/bottom.
    pub const VERTICAL: Flip = Flip {
        horizontal: false,
        vertical: true,
    };
    /// Mirror both axes.
    pub const BOTH: Flip = Flip {
        horizontal: true,
        vertical: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_area_dimensions() {
        let area = Area::new(10, 20, 19, 24);
        assert_eq!(area.width(), 10);
        assert_eq!(area.height(), 5);
        assert_eq!(area.short_side(), 5);
        assert_eq!(area.to_rect(), Rect::new(10, 20, 10, 5));
        assert_eq!(Area::from_origin_size(10, 20, 10, 5), area);
    }

    #[test]
    fn intersection_of_disjoint_areas_is_none() {
        let a = Area::new(0, 0, 9, 9);
        let b = Area::new(10, 0, 19, 9);
        assert!(a.intersect(&b).is_none());
        assert_eq!(
            a.intersect(&Area::new(5, 5, 30, 30)),
            Some(Area::new(5, 5, 9, 9))
        );
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.intersect(&Rect::new(5, -5, 10, 10)), Some(Rect::new(5, 0, 5, 5)));
        assert!(a.intersect(&Rect::new(10, 0, 5, 5)).is_none());
    }

    #[test]
    fn grow_and_origin() {
        let area = Area::new(5, 5, 14, 14).grow(2);
        assert_eq!(area, Area::new(3, 3, 16, 16));
        assert_eq!(area.at_origin(), Area::new(0, 0, 13, 13));
        assert!(area.contains(3, 16));
        assert!(!area.contains(2, 16));
    }
}
