use crate::foundation::core::{Affine, Color, Point};
use crate::foundation::math::{premultiply, unpremultiply};

/// Two-stop linear gradient in the canvas's user space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinearGradient {
    /// Point where `start_color` is fully applied.
    pub start: Point,
    /// Point where `end_color` is fully applied.
    pub end: Point,
    /// Colour at and before `start`.
    pub start_color: Color,
    /// Colour at and past `end`.
    pub end_color: Color,
}

/// Paint used by fills and strokes.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Brush {
    /// One straight-alpha colour.
    Solid(Color),
    /// Linear gradient, padded past both ends.
    Linear(LinearGradient),
}

impl From<Color> for Brush {
    fn from(c: Color) -> Self {
        Self::Solid(c)
    }
}

impl From<LinearGradient> for Brush {
    fn from(g: LinearGradient) -> Self {
        Self::Linear(g)
    }
}

impl Brush {
    /// True when painting with this brush cannot change any pixel.
    pub fn is_invisible(&self) -> bool {
        match self {
            Self::Solid(c) => c.a == 0,
            Self::Linear(g) => g.start_color.a == 0 && g.end_color.a == 0,
        }
    }

    /// Resolve against a user-to-device transform for per-pixel evaluation in device space.
    pub(crate) fn shader(&self, transform: Affine) -> Shader {
        match *self {
            Self::Solid(c) => Shader::Solid(c.to_array()),
            Self::Linear(g) => {
                let d = g.end - g.start;
                let dd = d.hypot2();
                let inv = transform.inverse();
                if !dd.is_finite() || dd <= 0.0 || !inv.is_finite() {
                    return Shader::Solid(g.start_color.to_array());
                }
                // t is affine in device coordinates: t(p) = dot(inv * p - start, d) / |d|^2.
                let [a, b, c, dm, e, f] = inv.as_coeffs();
                Shader::Linear {
                    tx: (a * d.x + b * d.y) / dd,
                    ty: (c * d.x + dm * d.y) / dd,
                    t0: ((e - g.start.x) * d.x + (f - g.start.y) * d.y) / dd,
                    c0: premultiply(g.start_color.to_array()),
                    c1: premultiply(g.end_color.to_array()),
                }
            }
        }
    }
}

/// Device-space form of a [`Brush`].
#[derive(Clone, Copy, Debug)]
pub(crate) enum Shader {
    Solid([u8; 4]),
    Linear {
        tx: f64,
        ty: f64,
        t0: f64,
        c0: [u8; 4],
        c1: [u8; 4],
    },
}

impl Shader {
    /// Straight RGBA at device point `(x, y)`. Stops are interpolated premultiplied.
    #[inline]
    pub(crate) fn at(&self, x: f64, y: f64) -> [u8; 4] {
        match *self {
            Self::Solid(c) => c,
            Self::Linear { tx, ty, t0, c0, c1 } => {
                let t = (t0 + tx * x + ty * y).clamp(0.0, 1.0);
                let mut out = [0u8; 4];
                for i in 0..4 {
                    let a = f64::from(c0[i]);
                    let b = f64::from(c1[i]);
                    out[i] = (a + (b - a) * t).round().clamp(0.0, 255.0) as u8;
                }
                unpremultiply(out)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/brush.rs"]
mod tests;
