use kurbo::Shape;
use smallvec::SmallVec;

use crate::canvas::rasterizer::Rasterizer;
use crate::foundation::core::{Affine, BezPath, IntRect};

const MASK_TOLERANCE: f64 = 0.1;

/// Region used by exclusion and inclusion masking, in canvas pixel space.
///
/// Masks ignore the canvas transform and clip. A mask is rebuilt when the owning layer's
/// exclusion configuration changes, not per frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipMask {
    /// Union of rectangles; overlaps are not cleared twice.
    Rects(SmallVec<[IntRect; 4]>),
    /// One rectangle rotated by `angle_rad` about its own centre.
    Rotated {
        /// Unrotated rectangle.
        rect: IntRect,
        /// Clockwise rotation in radians (y points down).
        angle_rad: f64,
    },
}

impl ClipMask {
    /// Mask covering a single rectangle.
    pub fn rect(rect: IntRect) -> Self {
        Self::Rects(smallvec::smallvec![rect])
    }

    /// Mask covering the union of `rects`.
    pub fn rects(rects: impl IntoIterator<Item = IntRect>) -> Self {
        Self::Rects(rects.into_iter().collect())
    }

    /// Mask covering `rect` rotated about its centre.
    pub fn rotated(rect: IntRect, angle_rad: f64) -> Self {
        Self::Rotated { rect, angle_rad }
    }

    /// True when the mask covers nothing; masking with it is a no-op.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::Rects(rects) => rects.iter().all(|r| r.is_empty()),
            Self::Rotated { rect, angle_rad } => rect.is_empty() || !angle_rad.is_finite(),
        }
    }

    /// Outline of the mask. Empty rectangles contribute nothing.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        match self {
            Self::Rects(rects) => {
                for r in rects.iter().filter(|r| !r.is_empty()) {
                    path.extend(r.to_rect().path_elements(MASK_TOLERANCE));
                }
            }
            Self::Rotated { rect, angle_rad } => {
                if !rect.is_empty() {
                    let r = rect.to_rect();
                    path.extend(r.path_elements(MASK_TOLERANCE));
                    path.apply_affine(Affine::rotate_about(*angle_rad, r.center()));
                }
            }
        }
        path
    }
}

impl From<IntRect> for ClipMask {
    fn from(rect: IntRect) -> Self {
        Self::rect(rect)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MaskOp {
    /// Clear inside the mask.
    Exclude,
    /// Clear outside the mask.
    IncludeOnly,
}

/// Walk the pixel runs `op` clears on a `width x height` surface, as `clear(y, x0, x1)`.
///
/// Degenerate masks produce no runs for either op.
pub(crate) fn for_each_cleared_run(
    rasterizer: &mut Rasterizer,
    mask: &ClipMask,
    op: MaskOp,
    width: u32,
    height: u32,
    mut clear: impl FnMut(u32, u32, u32),
) {
    if mask.is_degenerate() || width == 0 || height == 0 {
        return;
    }
    let path = mask.to_path();
    rasterizer.fill(
        &path,
        Affine::IDENTITY,
        MASK_TOLERANCE,
        IntRect::from_size(width, height),
        |y, spans| match op {
            MaskOp::Exclude => {
                for &(x0, x1) in spans {
                    clear(y, x0, x1);
                }
            }
            MaskOp::IncludeOnly => {
                let mut cursor = 0;
                for &(x0, x1) in spans {
                    if x0 > cursor {
                        clear(y, cursor, x0);
                    }
                    cursor = x1;
                }
                if cursor < width {
                    clear(y, cursor, width);
                }
            }
        },
    );
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/mask.rs"]
mod tests;
