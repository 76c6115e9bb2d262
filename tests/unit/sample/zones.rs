use super::*;
use crate::canvas::{CanvasBackend, CanvasSettings};
use crate::canvas::brush::Brush;
use crate::foundation::core::Rect;

fn two_zone_map() -> ZoneMap {
    ZoneMap::from_zones([
        Zone {
            id: ZoneId(7),
            rect: IntRect::new(0, 0, 5, 5),
        },
        Zone {
            id: ZoneId(3),
            rect: IntRect::new(5, 5, 5, 5),
        },
    ])
    .unwrap()
}

#[test]
fn zone_map_parses_json_and_keeps_order() {
    let map = ZoneMap::from_json(
        r#"{"zones":[{"id":2,"rect":{"x":1,"y":2,"width":3,"height":4}},
                     {"id":1,"rect":{"x":-1,"y":0,"width":2,"height":2}}]}"#,
    )
    .unwrap();
    let ids: Vec<u32> = map.iter().map(|z| z.id.0).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(map.get(ZoneId(2)), Some(IntRect::new(1, 2, 3, 4)));

    let back = ZoneMap::from_json(&map.to_json().unwrap()).unwrap();
    assert_eq!(back, map);
}

#[test]
fn duplicate_zone_ids_are_rejected() {
    let json = r#"{"zones":[{"id":1,"rect":{"x":0,"y":0,"width":1,"height":1}},
                            {"id":1,"rect":{"x":1,"y":0,"width":1,"height":1}}]}"#;
    assert!(matches!(ZoneMap::from_json(json), Err(ZonelightError::Validation(_))));
    assert!(matches!(ZoneMap::from_json("{"), Err(ZonelightError::Serde(_))));
}

#[test]
fn insert_replaces_existing_zone() {
    let mut map = ZoneMap::new();
    map.insert(ZoneId(1), IntRect::new(0, 0, 1, 1));
    map.insert(ZoneId(1), IntRect::new(2, 2, 1, 1));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(ZoneId(1)), Some(IntRect::new(2, 2, 1, 1)));
}

#[test]
fn settings_fill_defaults_from_partial_json() {
    let s = SamplerSettings::from_json(r#"{"backend":"vector","force_scalar":true}"#).unwrap();
    assert_eq!(s.backend, BackendKind::Vector);
    assert_eq!(s.alpha_mode, AlphaMode::Straight);
    assert_eq!(s.buffer_cache, BufferCacheOpts::default());
    assert_eq!(s.reducer(), Reducer::Scalar);
    assert!(SamplerSettings::from_json(r#"{"alpha_mode":"median"}"#).is_err());
}

#[test]
fn sampler_reads_every_zone_in_order() {
    let mut canvas = Canvas::new(BackendKind::Raster, 10, 10, &CanvasSettings::default()).unwrap();
    canvas.fill_rect(&Brush::Solid(Color::opaque(255, 0, 0)), Rect::new(0.0, 0.0, 10.0, 10.0));
    canvas.exclude_region(&crate::canvas::mask::ClipMask::rect(IntRect::new(0, 0, 5, 5)));

    let mut sampler = ZoneSampler::new(&SamplerSettings::default());
    let colors = sampler.sample(&mut canvas, &two_zone_map()).unwrap();
    assert_eq!(
        colors.as_slice(),
        &[
            (ZoneId(7), Color::TRANSPARENT),
            (ZoneId(3), Color::opaque(255, 0, 0))
        ]
    );
    assert_eq!(colors.get(ZoneId(3)), Some(Color::opaque(255, 0, 0)));
    assert_eq!(colors.get(ZoneId(99)), None);
}

#[test]
fn steady_state_frames_reuse_buffers() {
    let mut canvas = Canvas::new(BackendKind::Vector, 10, 10, &CanvasSettings::default()).unwrap();
    let settings = SamplerSettings {
        backend: BackendKind::Vector,
        ..SamplerSettings::default()
    };
    let mut sampler = ZoneSampler::new(&settings);
    let zones = two_zone_map();
    for _ in 0..3 {
        canvas.fill_rect(&Brush::Solid(Color::opaque(0, 0, 255)), Rect::new(0.0, 0.0, 10.0, 10.0));
        let colors = sampler.sample(&mut canvas, &zones).unwrap();
        assert_eq!(colors.len(), 2);
    }
    let stats = sampler.cache_stats();
    assert_eq!(stats.allocations, 1);
    assert_eq!(stats.hits, 5);

    sampler.on_layout_change();
    assert_eq!(sampler.cache_stats().retained_buffers, 0);
}

#[test]
fn sampler_rejects_canvases_from_other_backends() {
    let mut canvas = Canvas::new(BackendKind::Vector, 4, 4, &CanvasSettings::default()).unwrap();
    let mut sampler = ZoneSampler::new(&SamplerSettings::default());
    let err = sampler.sample(&mut canvas, &two_zone_map()).unwrap_err();
    assert!(matches!(err, ZonelightError::BackendMismatch { .. }));
}

#[test]
fn weighted_mode_ignores_transparent_pixels() {
    let mut canvas = Canvas::new(BackendKind::Raster, 10, 10, &CanvasSettings::default()).unwrap();
    canvas.fill_rect(&Brush::Solid(Color::opaque(0, 200, 0)), Rect::new(0.0, 0.0, 5.0, 10.0));
    let zones = ZoneMap::from_zones([Zone {
        id: ZoneId(0),
        rect: IntRect::from_size(10, 10),
    }])
    .unwrap();

    let mut sampler = ZoneSampler::new(&SamplerSettings::default());
    let straight = sampler.sample(&mut canvas, &zones).unwrap().get(ZoneId(0));
    assert_eq!(straight, Some(Color::from_rgba8(0, 100, 0, 127)));

    sampler.set_alpha_mode(AlphaMode::Weighted);
    let weighted = sampler.sample(&mut canvas, &zones).unwrap().get(ZoneId(0));
    assert_eq!(weighted, Some(Color::from_rgba8(0, 200, 0, 127)));
}

#[test]
fn free_function_matches_sampler() {
    let mut canvas = Canvas::new(BackendKind::Raster, 10, 10, &CanvasSettings::default()).unwrap();
    canvas.fill_rect(&Brush::Solid(Color::opaque(9, 8, 7)), Rect::new(0.0, 0.0, 6.0, 6.0));
    let zones = two_zone_map();
    let mut cache = PixelBufferCache::default();
    let mut out = ZoneColors::new();
    {
        let reader = canvas.reader().unwrap();
        sample_zones_with(&reader, &zones, AlphaMode::Straight, &mut cache, Reducer::Scalar, &mut out);
    }
    let mut sampler = ZoneSampler::new(&SamplerSettings::default());
    assert_eq!(sampler.sample(&mut canvas, &zones).unwrap(), &out);
}
