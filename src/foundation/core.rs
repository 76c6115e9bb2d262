pub use kurbo::{Affine, BezPath, Ellipse, Line, Point, Rect, Vec2};

/// Integer, axis-aligned pixel rectangle.
///
/// The origin may be negative (partially off-canvas rectangles are valid input); the unsigned
/// extents make `width >= 0 && height >= 0` hold by construction.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct IntRect {
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl IntRect {
    /// Create a rectangle from origin and size.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The `[0, width) x [0, height)` rectangle of a surface.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Number of pixels covered.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Overlap of two rectangles, or `None` when they share no pixel.
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x0 = i64::from(self.x).max(i64::from(other.x));
        let y0 = i64::from(self.y).max(i64::from(other.y));
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Return `true` when `(px, py)` lies inside.
    pub fn contains(self, px: i64, py: i64) -> bool {
        px >= i64::from(self.x) && px < self.right() && py >= i64::from(self.y) && py < self.bottom()
    }

    /// Floating-point rectangle with the same edges.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            self.right() as f64,
            self.bottom() as f64,
        )
    }

    /// Pixels whose centres fall inside `rect`.
    pub fn covering_centers(rect: Rect) -> Self {
        let rect = rect.abs();
        let x0 = (rect.x0 - 0.5).ceil();
        let y0 = (rect.y0 - 0.5).ceil();
        let x1 = (rect.x1 - 0.5).ceil();
        let y1 = (rect.y1 - 0.5).ceil();
        if !(x1 > x0 && y1 > y0) {
            return Self::new(x0 as i32, y0 as i32, 0, 0);
        }
        Self::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

/// Straight (non-premultiplied) RGBA8 colour.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; 0 is fully transparent.
    pub a: u8,
}

impl Color {
    /// Fully transparent black, the result of sampling an empty region.
    pub const TRANSPARENT: Self = Self::from_rgba8(0, 0, 0, 0);

    /// Build from straight RGBA8 components.
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build an opaque colour.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba8(r, g, b, 255)
    }

    /// Same colour with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Pack into a 32-bit word: `r` in the low byte, then `g`, `b`, `a`.
    #[inline]
    pub const fn pack(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Inverse of [`Color::pack`].
    #[inline]
    pub const fn unpack(word: u32) -> Self {
        let [r, g, b, a] = word.to_le_bytes();
        Self { r, g, b, a }
    }

    /// Components as `[r, g, b, a]`.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from `[r, g, b, a]`.
    pub const fn from_array(rgba: [u8; 4]) -> Self {
        Self::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Premultiplied `[r, g, b, a]`.
    pub fn to_premul(self) -> [u8; 4] {
        crate::foundation::math::premultiply(self.to_array())
    }

    /// Build from premultiplied `[r, g, b, a]`.
    pub fn from_premul(rgba: [u8; 4]) -> Self {
        Self::from_array(crate::foundation::math::unpremultiply(rgba))
    }
}

/// How a region's alpha channel participates in averaging.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlphaMode {
    /// Every channel is summed and divided by the pixel count.
    #[default]
    Straight,
    /// Colour channels are weighted by alpha and divided by the summed alpha, so fully
    /// transparent pixels do not darken the result. Alpha itself is still a plain mean.
    Weighted,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
