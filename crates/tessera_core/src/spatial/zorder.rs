//! # Z-Order Keys
//!
//! Signed tile coordinates are folded onto a single `u64` with a Morton
//! (z-order) curve:
//!
//! ```text
//! 1. zigzag each axis:   n >= 0 -> 2n,  n < 0 -> -2n - 1
//! 2. interleave bits:    x0 y0 x1 y1 x2 y2 ...  (x0 = bit 0 of x)
//! ```
//!
//! Tiles that are close on the plane mostly end up with close keys, so an
//! ordered map over [`TileKey`] keeps neighbours near each other.

/// Integer tile coordinate on the plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// X coordinate (in tiles).
    pub x: i32,
    /// Y coordinate (in tiles).
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing a world position: `floor(position / tile_size)`.
    ///
    /// Coordinates beyond the `i32` range saturate.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_position(position: [f64; 2], tile_size: f64) -> Self {
        Self {
            x: (position[0] / tile_size).floor() as i32,
            y: (position[1] / tile_size).floor() as i32,
        }
    }

    /// World position of the tile's lower corner.
    #[inline]
    #[must_use]
    pub fn origin(self, tile_size: f64) -> [f64; 2] {
        [f64::from(self.x) * tile_size, f64::from(self.y) * tile_size]
    }
}

/// Z-order key of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TileKey(u64);

impl TileKey {
    /// Encodes a tile coordinate.
    #[inline]
    #[must_use]
    pub fn encode(coord: TileCoord) -> Self {
        Self(spread(zigzag(coord.x)) | (spread(zigzag(coord.y)) << 1))
    }

    /// Decodes back to the tile coordinate.
    #[inline]
    #[must_use]
    pub fn decode(self) -> TileCoord {
        TileCoord {
            x: unzigzag(compact(self.0)),
            y: unzigzag(compact(self.0 >> 1)),
        }
    }

    /// Wraps a raw key.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw key value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<TileCoord> for TileKey {
    fn from(coord: TileCoord) -> Self {
        Self::encode(coord)
    }
}

/// Maps a signed value onto the non-negative integers.
#[inline]
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub const fn zigzag(n: i32) -> u32 {
    if n >= 0 {
        (n as u32) << 1
    } else {
        (-2 * (n as i64) - 1) as u32
    }
}

/// Inverse of [`zigzag`].
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const fn unzigzag(m: u32) -> i32 {
    if m & 1 == 0 {
        (m >> 1) as i32
    } else {
        (-((m as i64 + 1) / 2)) as i32
    }
}

/// Moves bit `i` of `v` to bit `2i` of the result.
#[inline]
const fn spread(v: u32) -> u64 {
    let mut x = v as u64;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

/// Gathers the even bits of `x` back into a `u32`.
#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn compact(x: u64) -> u32 {
    let mut x = x & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x >> 16)) & 0x0000_0000_FFFF_FFFF;
    x as u32
}
