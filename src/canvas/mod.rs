//! Drawing surfaces for one frame of lighting effects.
//!
//! A [`Canvas`] is one of three backends chosen at construction: the software rasterizer, the
//! `vello_cpu` vector surface, or the `vello`/`wgpu` GPU surface (cargo feature `gpu`). Every
//! canvas starts fully transparent and is immediately sample-able through [`Canvas::reader`].

pub(crate) mod blend;
pub(crate) mod brush;
#[cfg(feature = "gpu")]
pub(crate) mod gpu;
pub(crate) mod mask;
pub(crate) mod raster;
pub(crate) mod rasterizer;
pub(crate) mod readback;
pub(crate) mod vector;

use kurbo::Shape;

use crate::canvas::brush::Brush;
use crate::canvas::mask::ClipMask;
use crate::canvas::raster::RasterCanvas;
use crate::canvas::vector::VectorCanvas;
use crate::foundation::core::{Affine, AlphaMode, BezPath, Color, Ellipse, IntRect, Line, Rect};
use crate::foundation::error::{ZonelightError, ZonelightResult};
use crate::sample::reader::BitmapReader;
use crate::sample::scratch::PixelBufferCache;

const SHAPE_TOLERANCE: f64 = 0.1;

/// Which backend produced a canvas or surface.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Software scanline rasterizer over straight-alpha pixels.
    #[default]
    Raster,
    /// `vello_cpu` vector surface over premultiplied pixels.
    Vector,
    /// `vello` scene rendered on the GPU and read back on demand.
    Gpu,
}

/// Per-canvas defaults.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    /// Opacity applied when this canvas is blitted onto another, in `0.0..=1.0`.
    pub opacity: f32,
    /// Curve flattening tolerance in device pixels.
    pub tolerance: f64,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            tolerance: 0.1,
        }
    }
}

/// Drawing primitives shared by every backend.
///
/// Paths and brushes are in user space and go through the current transform. Clips and masks
/// are in canvas pixel space.
pub trait CanvasBackend {
    /// Backend tag.
    fn kind(&self) -> BackendKind;
    /// Width in pixels.
    fn width(&self) -> u32;
    /// Height in pixels.
    fn height(&self) -> u32;
    /// Current user-to-device transform.
    fn transform(&self) -> Affine;
    /// Replace the current transform.
    fn set_transform(&mut self, transform: Affine);
    /// Fill `path` with the non-zero rule.
    fn fill_path(&mut self, brush: &Brush, path: &BezPath);
    /// Stroke `path` with kurbo's default miter joins and butt caps.
    fn stroke_path(&mut self, brush: &Brush, path: &BezPath, width: f64);
    /// Set every pixel to transparent. Transform and clip are kept.
    fn clear(&mut self);
    /// Drop the transform and clip. Pixels are kept.
    fn reset(&mut self);
    /// Intersect the clip with `region`. Pixels whose centres fall outside are not drawn.
    fn set_clip(&mut self, region: Rect);
    /// Clear to transparent inside `mask`.
    fn exclude_region(&mut self, mask: &ClipMask);
    /// Clear to transparent outside `mask`.
    fn include_only_region(&mut self, mask: &ClipMask);

    /// Fill an axis-aligned rectangle.
    fn fill_rect(&mut self, brush: &Brush, rect: Rect) {
        self.fill_path(brush, &rect.to_path(SHAPE_TOLERANCE));
    }

    /// Fill an ellipse.
    fn fill_ellipse(&mut self, brush: &Brush, ellipse: Ellipse) {
        self.fill_path(brush, &ellipse.to_path(SHAPE_TOLERANCE));
    }

    /// Stroke a line segment.
    fn draw_line(&mut self, brush: &Brush, line: Line, width: f64) {
        let mut path = BezPath::new();
        path.move_to(line.p0);
        path.line_to(line.p1);
        self.stroke_path(brush, &path, width);
    }
}

/// Intersect `current` with the pixels whose centres lie in `region`.
pub(crate) fn narrow_clip(current: IntRect, region: Rect) -> IntRect {
    current
        .intersect(IntRect::covering_centers(region))
        .unwrap_or(IntRect::new(current.x, current.y, 0, 0))
}

#[derive(Debug)]
enum Surface {
    Raster(RasterCanvas),
    Vector(VectorCanvas),
    #[cfg(feature = "gpu")]
    Gpu(gpu::GpuCanvas),
}

impl Surface {
    fn backend(&self) -> &dyn CanvasBackend {
        match self {
            Self::Raster(c) => c,
            Self::Vector(c) => c,
            #[cfg(feature = "gpu")]
            Self::Gpu(c) => c,
        }
    }

    fn backend_mut(&mut self) -> &mut dyn CanvasBackend {
        match self {
            Self::Raster(c) => c,
            Self::Vector(c) => c,
            #[cfg(feature = "gpu")]
            Self::Gpu(c) => c,
        }
    }
}

/// In-memory drawable surface for one frame.
///
/// The backend is fixed at construction. Operations that combine two canvases require both to
/// use the same backend.
#[derive(Debug)]
pub struct Canvas {
    surface: Surface,
    opacity: f32,
}

impl Canvas {
    /// Create a fully transparent `width x height` canvas.
    pub fn new(
        kind: BackendKind,
        width: u32,
        height: u32,
        settings: &CanvasSettings,
    ) -> ZonelightResult<Self> {
        if width == 0 || height == 0 {
            return Err(ZonelightError::validation(format!(
                "canvas size must be non-zero, got {width}x{height}"
            )));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(ZonelightError::validation(format!(
                "canvas size {width}x{height} exceeds {}",
                u16::MAX
            )));
        }
        if !(settings.tolerance.is_finite() && settings.tolerance > 0.0) {
            return Err(ZonelightError::validation("tolerance must be positive"));
        }

        let surface = match kind {
            BackendKind::Raster => Surface::Raster(RasterCanvas::new(width, height, settings)),
            BackendKind::Vector => Surface::Vector(VectorCanvas::new(width, height, settings)?),
            #[cfg(feature = "gpu")]
            BackendKind::Gpu => Surface::Gpu(gpu::GpuCanvas::new(
                std::sync::Arc::new(gpu::GpuContext::new()?),
                width,
                height,
                settings,
            )?),
            #[allow(unreachable_patterns)]
            _ => {
                return Err(ZonelightError::unavailable(
                    "requested backend is not available",
                ));
            }
        };
        let mut canvas = Self {
            surface,
            opacity: 1.0,
        };
        canvas.set_opacity(settings.opacity);
        Ok(canvas)
    }

    /// Wrap an existing GPU canvas, e.g. one sharing a [`gpu::GpuContext`] with others.
    #[cfg(feature = "gpu")]
    pub fn from_gpu(canvas: gpu::GpuCanvas, settings: &CanvasSettings) -> Self {
        let mut out = Self {
            surface: Surface::Gpu(canvas),
            opacity: 1.0,
        };
        out.set_opacity(settings.opacity);
        out
    }

    /// Opacity applied when this canvas is blitted onto another.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set the blit opacity, clamped to `0.0..=1.0`. NaN maps to 0. Pixels are not modified.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
    }

    /// Composite `src` into `dest` (user space) with straight source-over, attenuated by
    /// `src`'s opacity.
    ///
    /// Both canvases must use the same backend. `src` is mutable only so pending vector work can
    /// be flushed or GPU pixels read back.
    pub fn blit(&mut self, src: &mut Canvas, dest: Rect) -> ZonelightResult<()> {
        let opacity = src.opacity;
        match (&mut self.surface, &mut src.surface) {
            (Surface::Raster(dst), Surface::Raster(s)) => {
                dst.blit_from(s, dest, opacity);
                Ok(())
            }
            (Surface::Vector(dst), Surface::Vector(s)) => dst.blit_from(s, dest, opacity),
            #[cfg(feature = "gpu")]
            (Surface::Gpu(dst), Surface::Gpu(s)) => dst.blit_from(s, dest, opacity),
            (dst, s) => Err(ZonelightError::backend_mismatch(
                dst.backend().kind(),
                s.backend().kind(),
            )),
        }
    }

    /// Sampling view over the current pixels.
    ///
    /// Commits pending vector work, or performs the GPU readback when draws happened since the
    /// last one. GPU readback failures are returned, never papered over with stale pixels.
    pub fn reader(&mut self) -> ZonelightResult<BitmapReader<'_>> {
        match &mut self.surface {
            Surface::Raster(c) => BitmapReader::from_view(c.view()?),
            Surface::Vector(c) => c.reader(),
            #[cfg(feature = "gpu")]
            Surface::Gpu(c) => c.reader(),
        }
    }

    /// Average colour of `rect`. Shorthand for `reader()?.region_color(..)`.
    pub fn region_color(
        &mut self,
        rect: IntRect,
        mode: AlphaMode,
        cache: &mut PixelBufferCache,
    ) -> ZonelightResult<Color> {
        Ok(self.reader()?.region_color(rect, mode, cache))
    }

    /// Canvas holding a straight-alpha image, e.g. a decoded texture to blit from.
    pub fn from_rgba_image(
        kind: BackendKind,
        image: &image::RgbaImage,
        settings: &CanvasSettings,
    ) -> ZonelightResult<Self> {
        let (w, h) = image.dimensions();
        let mut canvas = Self::new(kind, w, h, settings)?;
        match &mut canvas.surface {
            Surface::Raster(c) => {
                for (dst, px) in c.pixels_mut().iter_mut().zip(image.pixels()) {
                    *dst = Color::from_array(px.0).pack();
                }
            }
            Surface::Vector(c) => c.load_straight_rgba(image.as_raw()),
            #[cfg(feature = "gpu")]
            Surface::Gpu(c) => c.load_straight_rgba(image.as_raw())?,
        }
        Ok(canvas)
    }

    /// Straight-alpha snapshot of the current pixels.
    pub fn to_rgba_image(&mut self) -> ZonelightResult<image::RgbaImage> {
        let reader = self.reader()?;
        Ok(image::RgbaImage::from_fn(
            reader.width(),
            reader.height(),
            |x, y| image::Rgba(reader.pixel(x, y).unwrap_or(Color::TRANSPARENT).to_array()),
        ))
    }
}

impl CanvasBackend for Canvas {
    fn kind(&self) -> BackendKind {
        self.surface.backend().kind()
    }

    fn width(&self) -> u32 {
        self.surface.backend().width()
    }

    fn height(&self) -> u32 {
        self.surface.backend().height()
    }

    fn transform(&self) -> Affine {
        self.surface.backend().transform()
    }

    fn set_transform(&mut self, transform: Affine) {
        self.surface.backend_mut().set_transform(transform);
    }

    fn fill_path(&mut self, brush: &Brush, path: &BezPath) {
        self.surface.backend_mut().fill_path(brush, path);
    }

    fn stroke_path(&mut self, brush: &Brush, path: &BezPath, width: f64) {
        self.surface.backend_mut().stroke_path(brush, path, width);
    }

    fn clear(&mut self) {
        self.surface.backend_mut().clear();
    }

    fn reset(&mut self) {
        self.surface.backend_mut().reset();
    }

    fn set_clip(&mut self, region: Rect) {
        self.surface.backend_mut().set_clip(region);
    }

    fn exclude_region(&mut self, mask: &ClipMask) {
        self.surface.backend_mut().exclude_region(mask);
    }

    fn include_only_region(&mut self, mask: &ClipMask) {
        self.surface.backend_mut().include_only_region(mask);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/mod.rs"]
mod tests;
