use kurbo::{Affine, BezPath, PathEl, Point, Stroke, StrokeOpts};

use crate::foundation::core::IntRect;

#[derive(Clone, Copy, Debug)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    winding: i32,
}

/// Non-anti-aliased scanline converter.
///
/// A pixel is covered when its centre lies inside the path under the non-zero rule, so
/// integer-aligned rectangles cover exactly their pixels. Edge, crossing and span buffers are
/// kept between calls.
#[derive(Debug, Default)]
pub(crate) struct Rasterizer {
    edges: Vec<Edge>,
    crossings: Vec<(f64, i32)>,
    spans: Vec<(u32, u32)>,
}

impl Rasterizer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Scan-convert `path` under `transform`, calling `visit(y, spans)` once for every row of
    /// `clip`. Spans are half-open `[x0, x1)`, sorted, disjoint and inside `clip`.
    ///
    /// `clip` must not have a negative origin.
    pub(crate) fn fill(
        &mut self,
        path: &BezPath,
        transform: Affine,
        tolerance: f64,
        clip: IntRect,
        mut visit: impl FnMut(u32, &[(u32, u32)]),
    ) {
        if clip.is_empty() {
            return;
        }
        debug_assert!(clip.x >= 0 && clip.y >= 0);
        self.build_edges(path, transform, tolerance);

        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for e in &self.edges {
            lo = lo.min(e.y0);
            hi = hi.max(e.y1);
        }

        let x_min = clip.x as u32;
        let x_max = x_min + clip.width;
        for y in clip.y as u32..clip.y as u32 + clip.height {
            let cy = f64::from(y) + 0.5;
            self.spans.clear();
            if cy >= lo && cy < hi {
                self.scan_row(cy, x_min, x_max);
            }
            visit(y, &self.spans);
        }
    }

    /// Stroke `path` in user space with default joins and caps, then fill the outline.
    pub(crate) fn stroke(
        &mut self,
        path: &BezPath,
        width: f64,
        transform: Affine,
        tolerance: f64,
        clip: IntRect,
        visit: impl FnMut(u32, &[(u32, u32)]),
    ) {
        if !(width.is_finite() && width > 0.0) {
            return;
        }
        let outline = kurbo::stroke(
            path.iter(),
            &Stroke::new(width),
            &StrokeOpts::default(),
            tolerance,
        );
        self.fill(&outline, transform, tolerance, clip, visit);
    }

    fn build_edges(&mut self, path: &BezPath, transform: Affine, tolerance: f64) {
        self.edges.clear();
        let edges = &mut self.edges;
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        let mut open = false;
        kurbo::flatten(path.iter().map(|el| transform * el), tolerance, |el| match el {
            PathEl::MoveTo(p) => {
                if open {
                    push_edge(edges, last, start);
                }
                start = p;
                last = p;
                open = true;
            }
            PathEl::LineTo(p) => {
                push_edge(edges, last, p);
                last = p;
            }
            PathEl::ClosePath => {
                push_edge(edges, last, start);
                last = start;
            }
            // flatten only emits lines.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        });
        if open {
            push_edge(edges, last, start);
        }
    }

    fn scan_row(&mut self, cy: f64, x_min: u32, x_max: u32) {
        self.crossings.clear();
        for e in &self.edges {
            if e.y0 <= cy && cy < e.y1 {
                let x = e.x0 + (cy - e.y0) * (e.x1 - e.x0) / (e.y1 - e.y0);
                self.crossings.push((x, e.winding));
            }
        }
        self.crossings.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        let mut span_start = 0.0;
        for &(x, w) in &self.crossings {
            let was_inside = winding != 0;
            winding += w;
            let inside = winding != 0;
            if !was_inside && inside {
                span_start = x;
            } else if was_inside && !inside {
                push_span(&mut self.spans, span_start, x, x_min, x_max);
            }
        }
    }
}

fn push_edge(edges: &mut Vec<Edge>, a: Point, b: Point) {
    if a.y == b.y || !(a.is_finite() && b.is_finite()) {
        return;
    }
    let edge = if a.y < b.y {
        Edge {
            x0: a.x,
            y0: a.y,
            x1: b.x,
            y1: b.y,
            winding: 1,
        }
    } else {
        Edge {
            x0: b.x,
            y0: b.y,
            x1: a.x,
            y1: a.y,
            winding: -1,
        }
    };
    edges.push(edge);
}

/// Pixels whose centres fall in `[x0, x1)`, clamped to `[x_min, x_max)` and merged with the
/// previous span when they touch.
fn push_span(spans: &mut Vec<(u32, u32)>, x0: f64, x1: f64, x_min: u32, x_max: u32) {
    let clamp = |v: f64| -> u32 { v.clamp(f64::from(x_min), f64::from(x_max)) as u32 };
    let a = clamp((x0 - 0.5).ceil());
    let b = clamp((x1 - 0.5).ceil());
    if b <= a {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.1 >= a => last.1 = last.1.max(b),
        _ => spans.push((a, b)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/rasterizer.rs"]
mod tests;
