use crate::canvas::blend::{attenuate, over_straight};
use crate::canvas::brush::{Brush, Shader};
use crate::canvas::mask::{ClipMask, MaskOp, for_each_cleared_run};
use crate::canvas::rasterizer::Rasterizer;
use crate::canvas::{BackendKind, CanvasBackend, CanvasSettings, narrow_clip};
use crate::foundation::core::{Affine, BezPath, Color, IntRect, Point, Rect};
use crate::foundation::error::ZonelightResult;
use crate::foundation::math::opacity_u8;
use crate::sample::reduce::SurfaceView;

/// Software-raster canvas: straight-alpha packed pixels drawn by an immediate-mode scanline
/// rasterizer. Readers sample the pixel array in place.
#[derive(Debug)]
pub struct RasterCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    transform: Affine,
    clip: IntRect,
    tolerance: f64,
    rasterizer: Rasterizer,
}

impl RasterCanvas {
    pub(crate) fn new(width: u32, height: u32, settings: &CanvasSettings) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            transform: Affine::IDENTITY,
            clip: IntRect::from_size(width, height),
            tolerance: settings.tolerance,
            rasterizer: Rasterizer::new(),
        }
    }

    pub(crate) fn view(&self) -> ZonelightResult<SurfaceView<'_>> {
        SurfaceView::packed(&self.pixels, self.width, self.height, BackendKind::Raster)
    }

    /// Packed straight-alpha pixels, row-major.
    pub(crate) fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Draw `src` scaled into `dest` under the current transform, nearest-neighbour sampled.
    pub(crate) fn blit_from(&mut self, src: &RasterCanvas, dest: Rect, opacity: f32) {
        let op = opacity_u8(opacity);
        if op == 0 || src.width == 0 || src.height == 0 {
            return;
        }
        if !(dest.width() > 0.0 && dest.height() > 0.0) {
            return;
        }
        let (sw, sh) = (f64::from(src.width), f64::from(src.height));
        let map = self.transform
            * Affine::translate(dest.origin().to_vec2())
            * Affine::scale_non_uniform(dest.width() / sw, dest.height() / sh);
        let inv = map.inverse();
        if !inv.is_finite() {
            return;
        }

        let bbox = IntRect::covering_centers(map.transform_rect_bbox(Rect::new(0.0, 0.0, sw, sh)));
        let Some(area) = bbox.intersect(self.clip) else {
            return;
        };

        let w = self.width as usize;
        for y in area.y as u32..area.y as u32 + area.height {
            for x in area.x as u32..area.x as u32 + area.width {
                let q = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if !(q.x >= 0.0 && q.y >= 0.0 && q.x < sw && q.y < sh) {
                    continue;
                }
                let s = src.pixels[q.y as usize * src.width as usize + q.x as usize];
                let s = attenuate(Color::unpack(s).to_array(), op);
                let d = &mut self.pixels[y as usize * w + x as usize];
                *d = Color::from_array(over_straight(Color::unpack(*d).to_array(), s)).pack();
            }
        }
    }

    fn paint(&mut self, brush: &Brush, path: &BezPath, stroke_width: Option<f64>) {
        if brush.is_invisible() {
            return;
        }
        let shader = brush.shader(self.transform);
        let opaque_fill = match shader {
            Shader::Solid(c) if c[3] == 255 => Some(Color::from_array(c).pack()),
            _ => None,
        };
        let w = self.width as usize;
        let pixels = &mut self.pixels;
        let visit = |y: u32, spans: &[(u32, u32)]| {
            let row = &mut pixels[y as usize * w..(y as usize + 1) * w];
            for &(x0, x1) in spans {
                let run = &mut row[x0 as usize..x1 as usize];
                if let Some(word) = opaque_fill {
                    run.fill(word);
                    continue;
                }
                for (x, d) in (x0..x1).zip(run.iter_mut()) {
                    let src = shader.at(f64::from(x) + 0.5, f64::from(y) + 0.5);
                    *d = Color::from_array(over_straight(Color::unpack(*d).to_array(), src)).pack();
                }
            }
        };

        let (transform, tolerance, clip) = (self.transform, self.tolerance, self.clip);
        match stroke_width {
            None => self.rasterizer.fill(path, transform, tolerance, clip, visit),
            Some(width) => self
                .rasterizer
                .stroke(path, width, transform, tolerance, clip, visit),
        }
    }

    fn apply_mask(&mut self, mask: &ClipMask, op: MaskOp) {
        let w = self.width as usize;
        let pixels = &mut self.pixels;
        for_each_cleared_run(&mut self.rasterizer, mask, op, self.width, self.height, |y, x0, x1| {
            let row = y as usize * w;
            pixels[row + x0 as usize..row + x1 as usize].fill(0);
        });
    }
}

impl CanvasBackend for RasterCanvas {
    fn kind(&self) -> BackendKind {
        BackendKind::Raster
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn fill_path(&mut self, brush: &Brush, path: &BezPath) {
        self.paint(brush, path, None);
    }

    fn stroke_path(&mut self, brush: &Brush, path: &BezPath, width: f64) {
        self.paint(brush, path, Some(width));
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
    }

    fn reset(&mut self) {
        self.transform = Affine::IDENTITY;
        self.clip = IntRect::from_size(self.width, self.height);
    }

    fn set_clip(&mut self, region: Rect) {
        self.clip = narrow_clip(self.clip, region);
    }

    fn exclude_region(&mut self, mask: &ClipMask) {
        self.apply_mask(mask, MaskOp::Exclude);
    }

    fn include_only_region(&mut self, mask: &ClipMask) {
        self.apply_mask(mask, MaskOp::IncludeOnly);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/raster.rs"]
mod tests;
