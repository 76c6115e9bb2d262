use super::*;

fn cleared(mask: &ClipMask, op: MaskOp, w: u32, h: u32) -> Vec<bool> {
    let mut out = vec![false; (w * h) as usize];
    let mut r = Rasterizer::new();
    for_each_cleared_run(&mut r, mask, op, w, h, |y, x0, x1| {
        for x in x0..x1 {
            let i = (y * w + x) as usize;
            assert!(!out[i], "pixel ({x},{y}) cleared twice");
            out[i] = true;
        }
    });
    out
}

#[test]
fn exclude_and_include_are_complements() {
    let mask = ClipMask::rects([IntRect::new(1, 1, 3, 2), IntRect::new(2, 2, 3, 3)]);
    let ex = cleared(&mask, MaskOp::Exclude, 8, 6);
    let inc = cleared(&mask, MaskOp::IncludeOnly, 8, 6);
    for (a, b) in ex.iter().zip(&inc) {
        assert_ne!(a, b);
    }
    assert_eq!(ex.iter().filter(|&&c| c).count(), 3 * 2 + 3 * 3 - 2);
}

#[test]
fn degenerate_masks_clear_nothing() {
    let empty = ClipMask::Rects(SmallVec::new());
    let zero = ClipMask::rect(IntRect::new(2, 2, 0, 5));
    let rotated = ClipMask::rotated(IntRect::new(2, 2, 3, 0), 0.3);
    for mask in [empty, zero, rotated] {
        assert!(mask.is_degenerate());
        for op in [MaskOp::Exclude, MaskOp::IncludeOnly] {
            assert!(cleared(&mask, op, 5, 5).iter().all(|&c| !c));
        }
    }
}

#[test]
fn off_canvas_parts_are_ignored() {
    let mask = ClipMask::rect(IntRect::new(-3, -3, 5, 5));
    let ex = cleared(&mask, MaskOp::Exclude, 4, 4);
    let expected: Vec<bool> = (0..16).map(|i| i % 4 < 2 && i / 4 < 2).collect();
    assert_eq!(ex, expected);
}

#[test]
fn quarter_turn_rotation_swaps_extents() {
    let mask = ClipMask::rotated(IntRect::new(0, 3, 8, 2), std::f64::consts::FRAC_PI_2);
    let ex = cleared(&mask, MaskOp::Exclude, 8, 8);
    for y in 0..8u32 {
        for x in 0..8u32 {
            let inside = (3..5).contains(&x);
            assert_eq!(ex[(y * 8 + x) as usize], inside, "({x},{y})");
        }
    }
}

#[test]
fn mask_round_trips_through_json() {
    let mask = ClipMask::rotated(IntRect::new(1, 2, 3, 4), 0.5);
    let json = serde_json::to_string(&mask).unwrap();
    assert!(json.contains("rotated"));
    let back: ClipMask = serde_json::from_str(&json).unwrap();
    assert_eq!(back, mask);
}
