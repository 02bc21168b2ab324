// this_file: src/key.rs

//! Byte keys for cached shape fragments.
//!
//! Every key is a magic byte naming the shape kind followed by little-endian
//! `i32` fields written in a fixed order by [`KeyBuilder`]. Keys are compared
//! and hashed as raw bytes only; nothing ever looks at the fields again, and
//! since the bytes are written explicitly there is no padding to leak into a
//! key.

use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::geometry::Coord;

/// Inline capacity of a key; every built-in key fits without allocating.
const KEY_INLINE: usize = 32;

/// Shape-kind discriminant stored in the first byte of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyMagic {
    /// Arc fragment
    Arc = 0x01,
    /// Decoded image
    Image = 0x11,
    /// Line
    Line = 0x21,
    /// One rounded background corner
    RectBg = 0x31,
    /// Full circle background
    CircleBg = 0x32,
    /// Blurred shadow
    RectShadow = 0x3A,
    /// Border ring
    RectBorder = 0x3B,
    /// Glyph atlas (atlases are looked up by font identity, never by key)
    Font = 0x41,
}

impl KeyMagic {
    /// Raw discriminant byte.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Opaque cache key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(SmallVec<[u8; KEY_INLINE]>);

impl CacheKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(SmallVec::from_slice(bytes))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the zero-length key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shape kind recorded in the first byte, if it is a known one.
    pub fn magic(&self) -> Option<KeyMagic> {
        let byte = *self.0.first()?;
        [
            KeyMagic::Arc,
            KeyMagic::Image,
            KeyMagic::Line,
            KeyMagic::RectBg,
            KeyMagic::CircleBg,
            KeyMagic::RectShadow,
            KeyMagic::RectBorder,
            KeyMagic::Font,
        ]
        .into_iter()
        .find(|magic| magic.as_byte() == byte)
    }

    /// Deterministic hash of the key bytes.
    pub fn hash64(&self) -> u64 {
        key_hash(&self.0)
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey(")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// True iff both keys have the same length and identical bytes.
pub fn key_equals(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a == b
}

/// Deterministic hash over key bytes, consistent with [`key_equals`].
pub fn key_hash(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Canonical serializer for key fields.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    bytes: SmallVec<[u8; KEY_INLINE]>,
}

impl KeyBuilder {
    /// Start a key for the given shape kind.
    pub fn new(magic: KeyMagic) -> Self {
        let mut bytes = SmallVec::new();
        bytes.push(magic.as_byte());
        Self { bytes }
    }

    /// Append one byte.
    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    /// Append a little-endian `i32`.
    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append a little-endian `u64`.
    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Finish the key.
    pub fn finish(&self) -> CacheKey {
        CacheKey(self.bytes.clone())
    }
}

/// A typed key whose fields serialize into a [`CacheKey`].
pub trait ShapeKey {
    /// Shape kind written into the first byte.
    fn magic(&self) -> KeyMagic;

    /// Append the kind-specific fields in declaration order.
    fn encode(&self, builder: &mut KeyBuilder);

    /// Canonical byte key.
    fn cache_key(&self) -> CacheKey {
        let mut builder = KeyBuilder::new(self.magic());
        self.encode(&mut builder);
        builder.finish()
    }
}

/// One rounded corner of a background, or a whole circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectBgKey {
    /// Full circle on a square instead of a corner fragment
    pub circle: bool,
    /// Corner radius
    pub radius: Coord,
    /// Fragment width
    pub width: Coord,
    /// Fragment height
    pub height: Coord,
}

impl ShapeKey for RectBgKey {
    fn magic(&self) -> KeyMagic {
        if self.circle {
            KeyMagic::CircleBg
        } else {
            KeyMagic::RectBg
        }
    }

    fn encode(&self, builder: &mut KeyBuilder) {
        builder.i32(self.radius).i32(self.width).i32(self.height);
    }
}

/// Blurred shadow texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowKey {
    /// Shadow area width
    pub width: Coord,
    /// Shadow area height
    pub height: Coord,
    /// Corner radius
    pub radius: Coord,
    /// Blur width
    pub blur: Coord,
    /// Horizontal offset
    pub offset_x: Coord,
    /// Vertical offset
    pub offset_y: Coord,
}

impl ShapeKey for ShadowKey {
    fn magic(&self) -> KeyMagic {
        KeyMagic::RectShadow
    }

    fn encode(&self, builder: &mut KeyBuilder) {
        builder
            .i32(self.width)
            .i32(self.height)
            .i32(self.radius)
            .i32(self.blur)
            .i32(self.offset_x)
            .i32(self.offset_y);
    }
}

/// Border ring texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderKey {
    /// Outer radius
    pub rout: Coord,
    /// Inner radius
    pub rin: Coord,
    /// Outer width
    pub width: Coord,
    /// Outer height
    pub height: Coord,
    /// Ring thickness
    pub thickness: Coord,
    /// Side mask (`BorderSide` bits)
    pub side: u8,
}

impl ShapeKey for BorderKey {
    fn magic(&self) -> KeyMagic {
        KeyMagic::RectBorder
    }

    fn encode(&self, builder: &mut KeyBuilder) {
        builder
            .i32(self.rout)
            .i32(self.rin)
            .i32(self.width)
            .i32(self.height)
            .i32(self.thickness)
            .u8(self.side);
    }
}

/// Background image texture, identified by a caller-assigned id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKey {
    /// Caller-assigned image id
    pub id: u64,
    /// Image width
    pub width: Coord,
    /// Image height
    pub height: Coord,
}

impl ShapeKey for ImageKey {
    fn magic(&self) -> KeyMagic {
        KeyMagic::Image
    }

    fn encode(&self, builder: &mut KeyBuilder) {
        builder.u64(self.id).i32(self.width).i32(self.height);
    }
}
