use super::*;

fn solid(width: u32, height: u32, c: Color) -> Vec<u32> {
    vec![c.pack(); (width * height) as usize]
}

fn random_surface(rng: &mut fastrand::Rng, width: u32, height: u32) -> Vec<u32> {
    (0..width * height).map(|_| rng.u32(..)).collect()
}

#[test]
fn constant_region_averages_to_itself() {
    let c = Color::from_rgba8(17, 130, 244, 201);
    let px = solid(40, 30, c);
    let view = SurfaceView::packed(&px, 40, 30, BackendKind::Raster).unwrap();
    for rect in [
        IntRect::new(0, 0, 40, 30),
        IntRect::new(3, 4, 1, 1),
        IntRect::new(5, 2, 33, 17),
    ] {
        for reducer in [Reducer::Scalar, Reducer::Avx2] {
            assert_eq!(
                average_color_with(&view, rect, AlphaMode::Straight, reducer),
                c
            );
            assert_eq!(
                average_color_with(&view, rect, AlphaMode::Weighted, reducer),
                c
            );
        }
    }
}

#[test]
fn zero_area_is_transparent() {
    let px = solid(8, 8, Color::opaque(255, 255, 255));
    let view = SurfaceView::packed(&px, 8, 8, BackendKind::Raster).unwrap();
    assert_eq!(
        average_color(&view, IntRect::new(2, 2, 0, 5), AlphaMode::Straight),
        Color::TRANSPARENT
    );
    assert_eq!(
        average_color(&view, IntRect::new(2, 2, 5, 0), AlphaMode::Weighted),
        Color::TRANSPARENT
    );
}

#[test]
fn outside_bounds_is_transparent() {
    let px = solid(8, 8, Color::opaque(255, 255, 255));
    let view = SurfaceView::packed(&px, 8, 8, BackendKind::Raster).unwrap();
    assert_eq!(
        average_color(&view, IntRect::new(8, 0, 4, 4), AlphaMode::Straight),
        Color::TRANSPARENT
    );
    assert_eq!(
        average_color(&view, IntRect::new(-10, -10, 5, 5), AlphaMode::Straight),
        Color::TRANSPARENT
    );
}

#[test]
fn partial_overlap_counts_only_inside_pixels() {
    let px = solid(4, 4, Color::opaque(100, 50, 25));
    let view = SurfaceView::packed(&px, 4, 4, BackendKind::Raster).unwrap();
    assert_eq!(
        average_color(&view, IntRect::new(-2, -2, 4, 4), AlphaMode::Straight),
        Color::opaque(100, 50, 25)
    );
}

#[test]
fn straight_mean_truncates_toward_zero() {
    let px = vec![
        Color::from_rgba8(0, 0, 0, 0).pack(),
        Color::from_rgba8(255, 3, 1, 255).pack(),
    ];
    let view = SurfaceView::packed(&px, 2, 1, BackendKind::Raster).unwrap();
    assert_eq!(
        average_color(&view, IntRect::new(0, 0, 2, 1), AlphaMode::Straight),
        Color::from_rgba8(127, 1, 0, 127)
    );
}

#[test]
fn weighted_mode_ignores_transparent_pixels() {
    let px = vec![
        Color::from_rgba8(0, 0, 0, 0).pack(),
        Color::from_rgba8(200, 100, 50, 255).pack(),
    ];
    let view = SurfaceView::packed(&px, 2, 1, BackendKind::Raster).unwrap();
    assert_eq!(
        average_color(&view, IntRect::new(0, 0, 2, 1), AlphaMode::Weighted),
        Color::from_rgba8(200, 100, 50, 127)
    );
}

#[test]
fn weighted_mode_on_fully_transparent_region_is_transparent() {
    let px = solid(4, 4, Color::from_rgba8(90, 90, 90, 0));
    let view = SurfaceView::packed(&px, 4, 4, BackendKind::Raster).unwrap();
    assert_eq!(
        average_color(&view, IntRect::new(0, 0, 4, 4), AlphaMode::Weighted),
        Color::TRANSPARENT
    );
}

#[test]
fn strided_view_skips_padding() {
    let red = Color::opaque(255, 0, 0).pack();
    let junk = Color::opaque(0, 255, 0).pack();
    // 3 px wide, stride 5 px; the two padding columns must never be read.
    let px = vec![red, red, red, junk, junk, red, red, red, junk, junk, red, red, red];
    let view = SurfaceView::new(&px, 3, 3, 5 * 4, BackendKind::Raster).unwrap();
    for reducer in [Reducer::Scalar, Reducer::Avx2] {
        assert_eq!(
            average_color_with(&view, view.bounds(), AlphaMode::Straight, reducer),
            Color::opaque(255, 0, 0)
        );
    }
}

#[test]
fn view_rejects_short_buffers_and_bad_strides() {
    let px = vec![0u32; 10];
    assert!(SurfaceView::packed(&px, 4, 3, BackendKind::Raster).is_err());
    assert!(SurfaceView::new(&px, 2, 2, 6, BackendKind::Raster).is_err());
    assert!(SurfaceView::new(&px, 4, 2, 8, BackendKind::Raster).is_err());
    assert!(SurfaceView::packed(&px, 5, 2, BackendKind::Raster).is_ok());
}

#[test]
fn scalar_and_simd_agree_on_random_regions() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_cafe);
    let (w, h) = (97u32, 61u32);
    let px = random_surface(&mut rng, w, h);
    let view = SurfaceView::packed(&px, w, h, BackendKind::Raster).unwrap();

    for _ in 0..1200 {
        let rect = IntRect::new(
            rng.i32(-8..w as i32),
            rng.i32(-8..h as i32),
            rng.u32(0..80),
            rng.u32(0..50),
        );
        for mode in [AlphaMode::Straight, AlphaMode::Weighted] {
            let a = average_color_with(&view, rect, mode, Reducer::Scalar);
            let b = average_color_with(&view, rect, mode, Reducer::Avx2);
            assert_eq!(a, b, "rect {rect:?} mode {mode:?}");
        }
    }
}

#[test]
fn scalar_and_simd_sums_agree_across_batch_boundaries() {
    let mut rng = fastrand::Rng::with_seed(7);
    let px = random_surface(&mut rng, 200, 1);
    for len in [0usize, 1, 31, 32, 33, 63, 64, 65, 127, 128, 200] {
        assert_eq!(
            run_sums(&px[..len], Reducer::Scalar),
            run_sums(&px[..len], Reducer::Avx2),
            "len {len}"
        );
    }
}

#[test]
fn oversized_regions_use_wide_accumulators() {
    let (w, h) = (1024u32, 600u32);
    assert!(u64::from(w) * u64::from(h) > SIMD_MAX_AREA);
    let white = Color::opaque(255, 255, 255);
    let px = solid(w, h, white);
    let view = SurfaceView::packed(&px, w, h, BackendKind::Raster).unwrap();
    assert_eq!(
        average_color_with(&view, view.bounds(), AlphaMode::Weighted, Reducer::Avx2),
        white
    );
}

#[test]
fn finish_with_zero_count_is_transparent() {
    let sums = ChannelSums {
        r: 10,
        ..ChannelSums::default()
    };
    assert_eq!(sums.finish(0, AlphaMode::Straight), Color::TRANSPARENT);
}
