use std::sync::Arc;

use crate::canvas::blend::premul_over_row;
use crate::canvas::brush::Brush;
use crate::canvas::mask::{ClipMask, MaskOp, for_each_cleared_run};
use crate::canvas::rasterizer::Rasterizer;
use crate::canvas::{BackendKind, CanvasBackend, CanvasSettings, narrow_clip};
use crate::foundation::core::{Affine, BezPath, IntRect, Rect};
use crate::foundation::error::{ZonelightError, ZonelightResult};
use crate::foundation::math::premultiply;
use crate::sample::reader::BitmapReader;

/// `vello_cpu` canvas over a premultiplied pixmap.
///
/// Draw calls are recorded into a [`vello_cpu::RenderContext`]. `vello_cpu` renders into a fresh
/// buffer, so pending work is rendered into a scratch layer and composited source-over into the
/// committed pixmap inside the current clip. Commits happen before masking, clip changes, blits
/// out of this canvas and sampling.
pub struct VectorCanvas {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    layer: vello_cpu::Pixmap,
    pending: bool,
    transform: Affine,
    clip: IntRect,
    rasterizer: Rasterizer,
}

impl std::fmt::Debug for VectorCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorCanvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pending", &self.pending)
            .field("transform", &self.transform)
            .field("clip", &self.clip)
            .finish_non_exhaustive()
    }
}

impl VectorCanvas {
    pub(crate) fn new(width: u32, height: u32, _settings: &CanvasSettings) -> ZonelightResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| ZonelightError::validation("vector canvas width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| ZonelightError::validation("vector canvas height exceeds u16"))?;
        Ok(Self {
            width: w,
            height: h,
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
            layer: vello_cpu::Pixmap::new(w, h),
            pending: false,
            transform: Affine::IDENTITY,
            clip: IntRect::from_size(width, height),
            rasterizer: Rasterizer::new(),
        })
    }

    fn stride(&self) -> usize {
        usize::from(self.width) * 4
    }

    /// Render pending draws and composite them into the committed pixmap.
    fn commit(&mut self) {
        if !self.pending {
            return;
        }
        self.ctx.flush();
        clear_pixmap_to_transparent(&mut self.layer);
        self.ctx.render_to_pixmap(&mut self.layer);

        let stride = self.stride();
        let clip = self.clip;
        if !clip.is_empty() {
            let dst = self.pixmap.data_as_u8_slice_mut();
            let src = self.layer.data_as_u8_slice();
            let (x0, x1) = (clip.x as usize * 4, (clip.x as usize + clip.width as usize) * 4);
            for y in clip.y as usize..clip.y as usize + clip.height as usize {
                let row = y * stride;
                premul_over_row(&mut dst[row + x0..row + x1], &src[row + x0..row + x1]);
            }
        }

        self.ctx.reset();
        self.pending = false;
    }

    pub(crate) fn reader(&mut self) -> ZonelightResult<BitmapReader<'_>> {
        self.commit();
        let stride = self.stride();
        BitmapReader::premultiplied(
            BackendKind::Vector,
            self.pixmap.data_as_u8_slice(),
            u32::from(self.width),
            u32::from(self.height),
            stride,
        )
    }

    /// Overwrite the committed pixels with straight RGBA8 bytes of the same size.
    pub(crate) fn load_straight_rgba(&mut self, rgba: &[u8]) {
        self.ctx.reset();
        self.pending = false;
        for (d, s) in self
            .pixmap
            .data_as_u8_slice_mut()
            .chunks_exact_mut(4)
            .zip(rgba.chunks_exact(4))
        {
            d.copy_from_slice(&premultiply([s[0], s[1], s[2], s[3]]));
        }
    }

    pub(crate) fn blit_from(
        &mut self,
        src: &mut VectorCanvas,
        dest: Rect,
        opacity: f32,
    ) -> ZonelightResult<()> {
        if opacity <= 0.0 || !(dest.width() > 0.0 && dest.height() > 0.0) {
            return Ok(());
        }
        src.commit();
        let pixmap = pixmap_from_premul_bytes(
            src.pixmap.data_as_u8_slice(),
            src.width,
            src.height,
        )?;
        let image = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        let (sw, sh) = (f64::from(src.width), f64::from(src.height));
        let map = self.transform
            * Affine::translate(dest.origin().to_vec2())
            * Affine::scale_non_uniform(dest.width() / sw, dest.height() / sh);

        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(map));
        self.ctx.set_paint(image);
        if opacity < 1.0 {
            self.ctx.push_opacity_layer(opacity);
        }
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, sw, sh));
        if opacity < 1.0 {
            self.ctx.pop_layer();
        }
        self.pending = true;
        Ok(())
    }

    fn set_brush(&mut self, brush: &Brush) {
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(self.transform));
        match brush {
            Brush::Solid(c) => {
                self.ctx
                    .set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
            }
            Brush::Linear(g) => {
                let c0 = g.start_color;
                let c1 = g.end_color;
                let gradient = vello_cpu::peniko::Gradient::new_linear(
                    vello_cpu::kurbo::Point::new(g.start.x, g.start.y),
                    vello_cpu::kurbo::Point::new(g.end.x, g.end.y),
                )
                .with_stops([
                    vello_cpu::peniko::Color::from_rgba8(c0.r, c0.g, c0.b, c0.a),
                    vello_cpu::peniko::Color::from_rgba8(c1.r, c1.g, c1.b, c1.a),
                ]);
                self.ctx.set_paint(gradient);
            }
        }
    }

    fn apply_mask(&mut self, mask: &ClipMask, op: MaskOp) {
        self.commit();
        let stride = self.stride();
        let (w, h) = (u32::from(self.width), u32::from(self.height));
        let data = self.pixmap.data_as_u8_slice_mut();
        for_each_cleared_run(&mut self.rasterizer, mask, op, w, h, |y, x0, x1| {
            let row = y as usize * stride;
            data[row + x0 as usize * 4..row + x1 as usize * 4].fill(0);
        });
    }
}

impl CanvasBackend for VectorCanvas {
    fn kind(&self) -> BackendKind {
        BackendKind::Vector
    }

    fn width(&self) -> u32 {
        u32::from(self.width)
    }

    fn height(&self) -> u32 {
        u32::from(self.height)
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn fill_path(&mut self, brush: &Brush, path: &BezPath) {
        if brush.is_invisible() || self.clip.is_empty() {
            return;
        }
        self.set_brush(brush);
        self.ctx.fill_path(&bezpath_to_cpu(path));
        self.pending = true;
    }

    fn stroke_path(&mut self, brush: &Brush, path: &BezPath, width: f64) {
        if brush.is_invisible() || self.clip.is_empty() || !(width.is_finite() && width > 0.0) {
            return;
        }
        self.set_brush(brush);
        self.ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
        self.ctx.stroke_path(&bezpath_to_cpu(path));
        self.pending = true;
    }

    fn clear(&mut self) {
        self.ctx.reset();
        self.pending = false;
        clear_pixmap_to_transparent(&mut self.pixmap);
    }

    fn reset(&mut self) {
        self.commit();
        self.transform = Affine::IDENTITY;
        self.clip = IntRect::from_size(self.width(), self.height());
    }

    fn set_clip(&mut self, region: Rect) {
        self.commit();
        self.clip = narrow_clip(self.clip, region);
    }

    fn exclude_region(&mut self, mask: &ClipMask) {
        self.apply_mask(mask, MaskOp::Exclude);
    }

    fn include_only_region(&mut self, mask: &ClipMask) {
        self.apply_mask(mask, MaskOp::IncludeOnly);
    }
}

fn clear_pixmap_to_transparent(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    rgba8_premul: &[u8],
    width: u16,
    height: u16,
) -> ZonelightResult<vello_cpu::Pixmap> {
    if rgba8_premul.len() != usize::from(width) * usize::from(height) * 4 {
        return Err(ZonelightError::validation("pixmap byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(usize::from(width) * usize::from(height));
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        width,
        height,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/vector.rs"]
mod tests;
