//! Area averaging of packed RGBA pixels.
//!
//! Two interchangeable summation paths exist: a portable scalar loop with `u64` accumulators and
//! an AVX2 kernel that keeps per-lane `u32` sums. Both produce the same integer sums, so the final
//! colours are bit-identical. The AVX2 path is only taken for regions of at most
//! [`SIMD_MAX_AREA`] pixels, which keeps its lane accumulators from overflowing.

use std::sync::OnceLock;

use crate::canvas::BackendKind;
use crate::foundation::core::{AlphaMode, Color, IntRect};
use crate::foundation::error::{ZonelightError, ZonelightResult};
use crate::sample::simd;

/// Pixels consumed per SIMD batch (four 8-lane loads).
pub const SIMD_BATCH_PIXELS: usize = 32;

/// Largest region the AVX2 path accepts.
///
/// Each of the 8 lanes sees at most `SIMD_MAX_AREA / 8 = 65_536` pixels, and the largest per-pixel
/// term is `255 * 255`, so a lane sum stays below `65_536 * 65_025 < u32::MAX`.
pub const SIMD_MAX_AREA: u64 = 512 * 1024;

/// Environment switch that pins [`Reducer::detect`] to the scalar path.
pub const FORCE_SCALAR_ENV: &str = "ZONELIGHT_FORCE_SCALAR";

/// Read-only view over a row-major surface of packed straight-alpha pixels.
///
/// The view is tagged with the backend that produced the pixels so consumers can reject surfaces
/// that did not come through the expected path.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceView<'a> {
    pixels: &'a [u32],
    width: u32,
    height: u32,
    stride_bytes: usize,
    kind: BackendKind,
}

impl<'a> SurfaceView<'a> {
    /// Wrap `pixels` laid out with `stride_bytes` between row starts.
    pub fn new(
        pixels: &'a [u32],
        width: u32,
        height: u32,
        stride_bytes: usize,
        kind: BackendKind,
    ) -> ZonelightResult<Self> {
        if !stride_bytes.is_multiple_of(4) {
            return Err(ZonelightError::validation(format!(
                "surface stride {stride_bytes} is not a whole number of pixels"
            )));
        }
        let stride = stride_bytes / 4;
        if stride < width as usize {
            return Err(ZonelightError::validation(format!(
                "surface stride {stride} px is narrower than width {width}"
            )));
        }
        let needed = if height == 0 {
            0
        } else {
            stride
                .checked_mul(height as usize - 1)
                .and_then(|n| n.checked_add(width as usize))
                .ok_or_else(|| ZonelightError::validation("surface size overflow"))?
        };
        if pixels.len() < needed {
            return Err(ZonelightError::validation(format!(
                "surface buffer holds {} px, {needed} required",
                pixels.len()
            )));
        }
        Ok(Self {
            pixels,
            width,
            height,
            stride_bytes,
            kind,
        })
    }

    /// Wrap a tightly packed `width * height` buffer.
    pub fn packed(
        pixels: &'a [u32],
        width: u32,
        height: u32,
        kind: BackendKind,
    ) -> ZonelightResult<Self> {
        Self::new(pixels, width, height, width as usize * 4, kind)
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Distance between row starts in bytes.
    pub fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }

    /// Backend that produced the pixels.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Full-surface rectangle.
    pub fn bounds(&self) -> IntRect {
        IntRect::from_size(self.width, self.height)
    }

    /// Pixel at `(x, y)`; panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        Color::unpack(self.pixels[y as usize * (self.stride_bytes / 4) + x as usize])
    }

    /// Horizontal run of `rect` on row `y`. `rect` must already be clipped to the bounds.
    fn run(&self, rect: IntRect, y: u32) -> &'a [u32] {
        let start = y as usize * (self.stride_bytes / 4) + rect.x as usize;
        &self.pixels[start..start + rect.width as usize]
    }

    fn rows(&self, rect: IntRect) -> impl Iterator<Item = &'a [u32]> + use<'a> {
        let view = *self;
        let y0 = rect.y as u32;
        (y0..y0 + rect.height).map(move |y| view.run(rect, y))
    }
}

/// Summation strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reducer {
    /// Portable loop with 64-bit accumulators.
    Scalar,
    /// 256-bit integer SIMD, 32 pixels per batch.
    Avx2,
}

impl Reducer {
    /// Best reducer for this CPU, detected once per process.
    ///
    /// Setting `ZONELIGHT_FORCE_SCALAR=1` (or `true`) pins the scalar path.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<Reducer> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let forced = std::env::var(FORCE_SCALAR_ENV)
                .map(|raw| {
                    let v = raw.trim().to_ascii_lowercase();
                    v == "1" || v == "true"
                })
                .unwrap_or(false);
            let reducer = if !forced && simd::avx2_available() {
                Reducer::Avx2
            } else {
                Reducer::Scalar
            };
            tracing::debug!(?reducer, forced, "selected region reducer");
            reducer
        })
    }

    /// Return `true` when this reducer can run on the current CPU.
    pub fn is_supported(self) -> bool {
        match self {
            Reducer::Scalar => true,
            Reducer::Avx2 => simd::avx2_available(),
        }
    }

    fn takes_simd_path(self, area: u64) -> bool {
        self == Reducer::Avx2 && area <= SIMD_MAX_AREA && self.is_supported()
    }
}

/// Per-channel sums over a set of pixels.
///
/// `ra`, `ga` and `ba` hold colour-times-alpha products for [`AlphaMode::Weighted`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelSums {
    /// Sum of red.
    pub r: u64,
    /// Sum of green.
    pub g: u64,
    /// Sum of blue.
    pub b: u64,
    /// Sum of alpha.
    pub a: u64,
    /// Sum of red * alpha.
    pub ra: u64,
    /// Sum of green * alpha.
    pub ga: u64,
    /// Sum of blue * alpha.
    pub ba: u64,
}

impl ChannelSums {
    /// Add one packed pixel.
    #[inline]
    pub fn add_pixel(&mut self, px: u32) {
        let r = u64::from(px & 0xff);
        let g = u64::from((px >> 8) & 0xff);
        let b = u64::from((px >> 16) & 0xff);
        let a = u64::from(px >> 24);
        self.r += r;
        self.g += g;
        self.b += b;
        self.a += a;
        self.ra += r * a;
        self.ga += g * a;
        self.ba += b * a;
    }

    /// Add a contiguous run with the scalar loop.
    pub fn add_run(&mut self, run: &[u32]) {
        for &px in run {
            self.add_pixel(px);
        }
    }

    /// Component-wise sum.
    pub fn merge(&mut self, other: Self) {
        self.r += other.r;
        self.g += other.g;
        self.b += other.b;
        self.a += other.a;
        self.ra += other.ra;
        self.ga += other.ga;
        self.ba += other.ba;
    }

    /// Reduce the sums over `count` pixels to one colour, truncating toward zero.
    pub fn finish(self, count: u64, mode: AlphaMode) -> Color {
        if count == 0 {
            return Color::TRANSPARENT;
        }
        match mode {
            AlphaMode::Straight => Color::from_rgba8(
                (self.r / count) as u8,
                (self.g / count) as u8,
                (self.b / count) as u8,
                (self.a / count) as u8,
            ),
            AlphaMode::Weighted => {
                if self.a == 0 {
                    return Color::TRANSPARENT;
                }
                Color::from_rgba8(
                    (self.ra / self.a) as u8,
                    (self.ga / self.a) as u8,
                    (self.ba / self.a) as u8,
                    (self.a / count) as u8,
                )
            }
        }
    }
}

/// Average colour of `rect` on `view` using the detected reducer.
///
/// Only the part of `rect` inside the surface counts. Empty or fully outside rectangles yield
/// [`Color::TRANSPARENT`].
pub fn average_color(view: &SurfaceView<'_>, rect: IntRect, mode: AlphaMode) -> Color {
    average_color_with(view, rect, mode, Reducer::detect())
}

/// [`average_color`] with an explicit reducer. Unsupported reducers fall back to scalar.
pub fn average_color_with(
    view: &SurfaceView<'_>,
    rect: IntRect,
    mode: AlphaMode,
    reducer: Reducer,
) -> Color {
    let Some(clipped) = rect.intersect(view.bounds()) else {
        return Color::TRANSPARENT;
    };
    region_sums(view, clipped, reducer).finish(clipped.area(), mode)
}

/// Sums over an already clipped rectangle.
pub(crate) fn region_sums(view: &SurfaceView<'_>, rect: IntRect, reducer: Reducer) -> ChannelSums {
    if reducer.takes_simd_path(rect.area())
        && let Some(sums) = simd::sum_rows(view.rows(rect))
    {
        return sums;
    }
    let mut sums = ChannelSums::default();
    for row in view.rows(rect) {
        sums.add_run(row);
    }
    sums
}

/// Sums over one contiguous run, e.g. a zero-padded scratch buffer.
pub(crate) fn run_sums(run: &[u32], reducer: Reducer) -> ChannelSums {
    if reducer.takes_simd_path(run.len() as u64)
        && let Some(sums) = simd::sum_rows(std::iter::once(run))
    {
        return sums;
    }
    let mut sums = ChannelSums::default();
    sums.add_run(run);
    sums
}

#[cfg(test)]
#[path = "../../tests/unit/sample/reduce.rs"]
mod tests;
