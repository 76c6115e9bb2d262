use crate::canvas::BackendKind;
use crate::foundation::core::{AlphaMode, Color, IntRect};
use crate::foundation::error::{ZonelightError, ZonelightResult};
use crate::foundation::math::unpremultiply;
use crate::sample::reduce::{Reducer, SurfaceView, average_color_with, run_sums};
use crate::sample::scratch::PixelBufferCache;

#[derive(Clone, Copy, Debug)]
enum Source<'a> {
    Straight(SurfaceView<'a>),
    Premul {
        bytes: &'a [u8],
        width: u32,
        height: u32,
        stride_bytes: usize,
    },
}

/// Sampling-only view over one canvas's pixels for the current frame.
///
/// Software-raster surfaces are read in place. Premultiplied surfaces (vector and GPU backends)
/// are converted rectangle by rectangle into a cached scratch buffer before reduction. A reader
/// borrows the canvas, so it cannot outlive the pixels or observe later draw calls.
#[derive(Clone, Copy, Debug)]
pub struct BitmapReader<'a> {
    kind: BackendKind,
    source: Source<'a>,
}

impl<'a> BitmapReader<'a> {
    /// Reader over a straight-alpha packed surface. Only the software rasterizer produces those.
    pub fn from_view(view: SurfaceView<'a>) -> ZonelightResult<Self> {
        if view.kind() != BackendKind::Raster {
            return Err(ZonelightError::backend_mismatch(
                BackendKind::Raster,
                view.kind(),
            ));
        }
        Ok(Self {
            kind: view.kind(),
            source: Source::Straight(view),
        })
    }

    /// Reader over premultiplied RGBA8 bytes produced by the vector or GPU backend.
    pub fn premultiplied(
        kind: BackendKind,
        bytes: &'a [u8],
        width: u32,
        height: u32,
        stride_bytes: usize,
    ) -> ZonelightResult<Self> {
        if kind == BackendKind::Raster {
            return Err(ZonelightError::validation(
                "raster surfaces are straight alpha; use BitmapReader::from_view",
            ));
        }
        if stride_bytes < width as usize * 4 {
            return Err(ZonelightError::validation(format!(
                "stride {stride_bytes} bytes is narrower than width {width}"
            )));
        }
        let needed = if height == 0 {
            0
        } else {
            stride_bytes * (height as usize - 1) + width as usize * 4
        };
        if bytes.len() < needed {
            return Err(ZonelightError::validation(format!(
                "premultiplied surface holds {} bytes, {needed} required",
                bytes.len()
            )));
        }
        Ok(Self {
            kind,
            source: Source::Premul {
                bytes,
                width,
                height,
                stride_bytes,
            },
        })
    }

    /// Backend that produced the pixels.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        match self.source {
            Source::Straight(v) => v.width(),
            Source::Premul { width, .. } => width,
        }
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        match self.source {
            Source::Straight(v) => v.height(),
            Source::Premul { height, .. } => height,
        }
    }

    /// Fail unless this reader was produced by `expected`.
    pub fn expect_kind(&self, expected: BackendKind) -> ZonelightResult<()> {
        if self.kind != expected {
            return Err(ZonelightError::backend_mismatch(expected, self.kind));
        }
        Ok(())
    }

    /// Straight-alpha colour of one pixel, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(match self.source {
            Source::Straight(v) => v.pixel(x, y),
            Source::Premul {
                bytes,
                stride_bytes,
                ..
            } => {
                let i = y as usize * stride_bytes + x as usize * 4;
                Color::from_array(unpremultiply([
                    bytes[i],
                    bytes[i + 1],
                    bytes[i + 2],
                    bytes[i + 3],
                ]))
            }
        })
    }

    /// Average colour of `rect` with the detected reducer.
    pub fn region_color(
        &self,
        rect: IntRect,
        mode: AlphaMode,
        cache: &mut PixelBufferCache,
    ) -> Color {
        self.region_color_with(rect, mode, cache, Reducer::detect())
    }

    /// Average colour of `rect` with an explicit reducer.
    pub fn region_color_with(
        &self,
        rect: IntRect,
        mode: AlphaMode,
        cache: &mut PixelBufferCache,
        reducer: Reducer,
    ) -> Color {
        match self.source {
            Source::Straight(view) => average_color_with(&view, rect, mode, reducer),
            Source::Premul {
                bytes,
                width,
                height,
                stride_bytes,
            } => {
                let Some(clipped) = rect.intersect(IntRect::from_size(width, height)) else {
                    return Color::TRANSPARENT;
                };
                let area = clipped.area() as usize;
                let scratch = cache.scratch(clipped.width, clipped.height);

                let row_bytes = clipped.width as usize * 4;
                let mut out = 0usize;
                for y in clipped.y as usize..clipped.y as usize + clipped.height as usize {
                    let start = y * stride_bytes + clipped.x as usize * 4;
                    for px in bytes[start..start + row_bytes].chunks_exact(4) {
                        scratch[out] = Color::from_array(unpremultiply([px[0], px[1], px[2], px[3]]))
                            .pack();
                        out += 1;
                    }
                }
                // Only the tail past the written pixels needs zeroing; zeros add nothing to sums.
                scratch[area..].fill(0);

                run_sums(scratch, reducer).finish(area as u64, mode)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sample/reader.rs"]
mod tests;
