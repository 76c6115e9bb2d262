use super::*;

#[test]
fn mul_div255_endpoints() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(0, 255), 0);
    assert_eq!(mul_div255_u8(200, 0), 0);
    assert_eq!(mul_div255_u8(128, 255), 128);
}

#[test]
fn opacity_u8_clamps_and_handles_nan() {
    assert_eq!(opacity_u8(0.0), 0);
    assert_eq!(opacity_u8(1.0), 255);
    assert_eq!(opacity_u8(2.0), 255);
    assert_eq!(opacity_u8(-1.0), 0);
    assert_eq!(opacity_u8(f32::NAN), 0);
    assert_eq!(opacity_u8(0.5), 128);
}

#[test]
fn premultiply_then_unpremultiply_is_exact_for_opaque_and_clear() {
    let opaque = [12, 200, 77, 255];
    assert_eq!(unpremultiply(premultiply(opaque)), opaque);
    assert_eq!(unpremultiply(premultiply([90, 80, 70, 0])), [0, 0, 0, 0]);
}

#[test]
fn unpremultiply_half_alpha_is_close() {
    let straight = [200, 100, 50, 128];
    let back = unpremultiply(premultiply(straight));
    for i in 0..3 {
        assert!((i32::from(back[i]) - i32::from(straight[i])).abs() <= 1);
    }
    assert_eq!(back[3], 128);
}
