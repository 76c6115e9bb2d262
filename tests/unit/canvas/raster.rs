use super::*;
use crate::canvas::brush::LinearGradient;
use crate::foundation::core::AlphaMode;
use crate::sample::reduce::average_color;
use kurbo::{Ellipse, Line};

fn canvas(w: u32, h: u32) -> RasterCanvas {
    RasterCanvas::new(w, h, &CanvasSettings::default())
}

fn avg(c: &RasterCanvas, rect: IntRect) -> Color {
    average_color(&c.view().unwrap(), rect, AlphaMode::Straight)
}

fn px(c: &RasterCanvas, x: u32, y: u32) -> Color {
    c.view().unwrap().pixel(x, y)
}

const RED: Color = Color::opaque(255, 0, 0);

#[test]
fn fill_rect_covers_exact_pixels() {
    let mut c = canvas(10, 10);
    c.fill_rect(&Brush::Solid(RED), Rect::new(2.0, 3.0, 6.0, 5.0));
    assert_eq!(avg(&c, IntRect::new(2, 3, 4, 2)), RED);
    assert_eq!(px(&c, 1, 3), Color::TRANSPARENT);
    assert_eq!(px(&c, 6, 3), Color::TRANSPARENT);
    assert_eq!(px(&c, 2, 5), Color::TRANSPARENT);
}

#[test]
fn translucent_fill_blends_over_existing_pixels() {
    let mut c = canvas(2, 1);
    c.fill_rect(&Brush::Solid(Color::opaque(0, 0, 255)), Rect::new(0.0, 0.0, 2.0, 1.0));
    c.fill_rect(&Brush::Solid(RED.with_alpha(128)), Rect::new(1.0, 0.0, 2.0, 1.0));
    assert_eq!(px(&c, 0, 0), Color::opaque(0, 0, 255));
    assert_eq!(
        px(&c, 1, 0).to_array(),
        over_straight([0, 0, 255, 255], [255, 0, 0, 128])
    );
}

#[test]
fn transform_applies_to_paths() {
    let mut c = canvas(8, 8);
    c.set_transform(Affine::translate((4.0, 4.0)));
    c.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 2.0, 2.0));
    assert_eq!(avg(&c, IntRect::new(4, 4, 2, 2)), RED);
    assert_eq!(avg(&c, IntRect::new(0, 0, 4, 4)), Color::TRANSPARENT);
}

#[test]
fn clips_intersect_and_reset_drops_them() {
    let mut c = canvas(8, 8);
    c.set_clip(Rect::new(0.0, 0.0, 4.0, 8.0));
    c.set_clip(Rect::new(2.0, 0.0, 8.0, 8.0));
    c.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 8.0, 8.0));
    assert_eq!(avg(&c, IntRect::new(2, 0, 2, 8)), RED);
    assert_eq!(px(&c, 1, 0), Color::TRANSPARENT);
    assert_eq!(px(&c, 4, 0), Color::TRANSPARENT);

    c.set_transform(Affine::scale(3.0));
    c.reset();
    assert_eq!(c.transform(), Affine::IDENTITY);
    assert_eq!(avg(&c, IntRect::new(2, 0, 2, 8)), RED);
    c.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 8.0, 8.0));
    assert_eq!(avg(&c, IntRect::from_size(8, 8)), RED);
}

#[test]
fn disjoint_clips_block_all_drawing() {
    let mut c = canvas(4, 4);
    c.set_clip(Rect::new(0.0, 0.0, 1.0, 1.0));
    c.set_clip(Rect::new(2.0, 2.0, 4.0, 4.0));
    c.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 4.0, 4.0));
    assert_eq!(avg(&c, IntRect::from_size(4, 4)), Color::TRANSPARENT);
}

#[test]
fn clear_keeps_transform() {
    let mut c = canvas(4, 4);
    c.set_transform(Affine::translate((1.0, 0.0)));
    c.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 1.0, 1.0));
    c.clear();
    assert_eq!(avg(&c, IntRect::from_size(4, 4)), Color::TRANSPARENT);
    assert_eq!(c.transform(), Affine::translate((1.0, 0.0)));
}

#[test]
fn ellipse_and_line_helpers_draw() {
    let mut c = canvas(20, 20);
    c.fill_ellipse(&Brush::Solid(RED), Ellipse::new((10.0, 10.0), (6.0, 3.0), 0.0));
    assert_eq!(px(&c, 10, 10), RED);
    assert_eq!(px(&c, 15, 10), RED);
    assert_eq!(px(&c, 10, 14), Color::TRANSPARENT);

    c.draw_line(&Brush::Solid(Color::opaque(0, 255, 0)), Line::new((0.0, 1.0), (20.0, 1.0)), 2.0);
    assert_eq!(avg(&c, IntRect::new(0, 0, 20, 2)), Color::opaque(0, 255, 0));
    assert_eq!(px(&c, 5, 2), Color::TRANSPARENT);
}

#[test]
fn gradient_fill_varies_across_the_rect() {
    let mut c = canvas(10, 1);
    let g = LinearGradient {
        start: Point::new(0.0, 0.0),
        end: Point::new(10.0, 0.0),
        start_color: Color::opaque(0, 0, 0),
        end_color: Color::opaque(200, 0, 0),
    };
    c.fill_rect(&Brush::Linear(g), Rect::new(0.0, 0.0, 10.0, 1.0));
    let reds: Vec<u8> = (0..10).map(|x| px(&c, x, 0).r).collect();
    assert_eq!(reds, vec![10, 30, 50, 70, 90, 110, 130, 150, 170, 190]);
}

#[test]
fn masks_clear_in_pixel_space() {
    let mut c = canvas(10, 10);
    c.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 10.0, 10.0));
    c.set_transform(Affine::scale(5.0));
    c.exclude_region(&ClipMask::rect(IntRect::new(0, 0, 5, 5)));
    assert_eq!(avg(&c, IntRect::new(0, 0, 5, 5)), Color::TRANSPARENT);
    assert_eq!(avg(&c, IntRect::new(5, 5, 5, 5)), RED);
    assert_eq!(avg(&c, IntRect::new(5, 0, 5, 5)), RED);

    c.include_only_region(&ClipMask::rect(IntRect::new(5, 5, 5, 5)));
    assert_eq!(avg(&c, IntRect::new(5, 0, 5, 5)), Color::TRANSPARENT);
    assert_eq!(avg(&c, IntRect::new(5, 5, 5, 5)), RED);
}

#[test]
fn blit_scales_and_attenuates() {
    let mut src = canvas(2, 2);
    src.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 1.0, 2.0));
    src.fill_rect(&Brush::Solid(Color::opaque(0, 0, 255)), Rect::new(1.0, 0.0, 2.0, 2.0));

    let mut dst = canvas(8, 8);
    dst.blit_from(&src, Rect::new(0.0, 0.0, 8.0, 4.0), 1.0);
    assert_eq!(avg(&dst, IntRect::new(0, 0, 4, 4)), RED);
    assert_eq!(avg(&dst, IntRect::new(4, 0, 4, 4)), Color::opaque(0, 0, 255));
    assert_eq!(avg(&dst, IntRect::new(0, 4, 8, 4)), Color::TRANSPARENT);

    let mut faint = canvas(8, 8);
    faint.blit_from(&src, Rect::new(0.0, 0.0, 8.0, 8.0), 0.5);
    assert_eq!(px(&faint, 0, 0), RED.with_alpha(128));
}

#[test]
fn blit_respects_clip_and_ignores_empty_dest() {
    let mut src = canvas(4, 4);
    src.fill_rect(&Brush::Solid(RED), Rect::new(0.0, 0.0, 4.0, 4.0));
    let mut dst = canvas(4, 4);
    dst.blit_from(&src, Rect::new(0.0, 0.0, 0.0, 4.0), 1.0);
    assert_eq!(avg(&dst, IntRect::from_size(4, 4)), Color::TRANSPARENT);

    dst.set_clip(Rect::new(0.0, 0.0, 2.0, 4.0));
    dst.blit_from(&src, Rect::new(0.0, 0.0, 4.0, 4.0), 1.0);
    assert_eq!(avg(&dst, IntRect::new(0, 0, 2, 4)), RED);
    assert_eq!(avg(&dst, IntRect::new(2, 0, 2, 4)), Color::TRANSPARENT);
}
