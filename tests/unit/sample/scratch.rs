use super::*;

#[test]
fn small_regions_get_at_least_one_chunk() {
    let mut cache = PixelBufferCache::default();
    assert_eq!(cache.scratch(1, 1).len(), MIN_CHUNK_PIXELS);
    assert_eq!(cache.scratch(0, 7).len(), MIN_CHUNK_PIXELS);
    assert_eq!(cache.scratch(10, 10).len(), 100);
}

#[test]
fn same_size_class_is_reused() {
    let mut cache = PixelBufferCache::default();
    cache.scratch(8, 8)[0] = 0xdead_beef;
    assert_eq!(cache.scratch(8, 8)[0], 0xdead_beef);

    let st = cache.stats();
    assert_eq!(st.allocations, 1);
    assert_eq!(st.hits, 1);
    assert_eq!(st.retained_buffers, 1);
    assert_eq!(st.retained_bytes, 64 * 4);
}

#[test]
fn distinct_shapes_with_equal_area_are_distinct_classes() {
    let mut cache = PixelBufferCache::default();
    let _ = cache.scratch(4, 16);
    let _ = cache.scratch(16, 4);
    assert_eq!(cache.stats().allocations, 2);
}

#[test]
fn byte_cap_routes_to_overflow_without_retaining() {
    let mut cache = PixelBufferCache::new(BufferCacheOpts {
        max_cached_bytes: 100 * 4,
    });
    assert_eq!(cache.scratch(10, 10).len(), 100);
    assert_eq!(cache.scratch(20, 20).len(), 400);
    assert_eq!(cache.scratch(20, 20).len(), 400);

    let st = cache.stats();
    assert_eq!(st.retained_buffers, 1);
    assert_eq!(st.retained_bytes, 400);
    assert_eq!(st.overflow_uses, 2);
}

#[test]
fn clear_resets_pool_and_stats() {
    let mut cache = PixelBufferCache::default();
    let _ = cache.scratch(3, 3);
    cache.clear();
    assert_eq!(cache.stats(), BufferCacheStats::default());
    let _ = cache.scratch(3, 3);
    assert_eq!(cache.stats().allocations, 1);
}
