use super::*;

#[test]
fn opaque_source_replaces_destination() {
    for dst in [[0, 0, 0, 0], [12, 34, 56, 78], [255, 255, 255, 255]] {
        assert_eq!(over_straight(dst, [9, 8, 7, 255]), [9, 8, 7, 255]);
    }
}

#[test]
fn transparent_source_keeps_destination() {
    for dst in [[0, 0, 0, 0], [12, 34, 56, 78], [255, 255, 255, 255]] {
        assert_eq!(over_straight(dst, [200, 100, 50, 0]), dst);
    }
}

#[test]
fn half_alpha_over_transparent_keeps_straight_colour() {
    assert_eq!(over_straight([0, 0, 0, 0], [200, 100, 50, 128]), [200, 100, 50, 128]);
}

#[test]
fn half_alpha_over_opaque_mixes_colour() {
    let out = over_straight([0, 0, 255, 255], [255, 0, 0, 128]);
    assert_eq!(out[3], 255);
    assert!((i32::from(out[0]) - 128).abs() <= 1, "{out:?}");
    assert!((i32::from(out[2]) - 127).abs() <= 1, "{out:?}");
}

#[test]
fn attenuate_scales_alpha_only() {
    assert_eq!(attenuate([10, 20, 30, 255], 255), [10, 20, 30, 255]);
    assert_eq!(attenuate([10, 20, 30, 255], 0), [10, 20, 30, 0]);
    assert_eq!(attenuate([10, 20, 30, 200], 128), [10, 20, 30, 100]);
}

#[test]
fn premul_row_over_matches_blend_laws() {
    let mut dst = vec![10u8, 20, 30, 40, 50, 60, 70, 80];
    premul_over_row(&mut dst, &[0, 0, 0, 0, 1, 2, 3, 255]);
    assert_eq!(dst, vec![10, 20, 30, 40, 1, 2, 3, 255]);

    let mut dst = vec![0u8, 0, 100, 255];
    premul_over_row(&mut dst, &[64, 0, 0, 128]);
    assert_eq!(dst, vec![64, 0, mul_div255_u8(100, 127), 255]);
}
