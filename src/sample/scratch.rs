use std::collections::HashMap;

/// Smallest scratch buffer handed out, in pixels. One SIMD batch.
pub const MIN_CHUNK_PIXELS: usize = 32;

/// Retention limits for [`PixelBufferCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BufferCacheOpts {
    /// Maximum bytes retained across all size classes.
    pub max_cached_bytes: usize,
}

impl Default for BufferCacheOpts {
    fn default() -> Self {
        Self {
            // A full-HD zone set would need far less; this only guards against runaway layouts.
            max_cached_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SizeKey {
    w: u32,
    h: u32,
}

impl SizeKey {
    fn pixel_len(self) -> usize {
        (self.w as usize)
            .saturating_mul(self.h as usize)
            .max(MIN_CHUNK_PIXELS)
    }

    fn byte_len(self) -> usize {
        self.pixel_len().saturating_mul(4)
    }
}

/// Counters describing cache behaviour since construction (or the last [`PixelBufferCache::clear`]).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferCacheStats {
    /// Distinct size classes currently retained.
    pub retained_buffers: usize,
    /// Bytes currently retained.
    pub retained_bytes: usize,
    /// Requests served from an existing size class.
    pub hits: u64,
    /// Size classes allocated.
    pub allocations: u64,
    /// Requests that exceeded `max_cached_bytes` and used the shared overflow buffer.
    pub overflow_uses: u64,
}

/// Size-keyed pool of scratch pixel buffers for the sampling hot path.
///
/// Each `(width, height)` class gets one buffer, allocated on first request and reused for the
/// lifetime of the cache. One instance per rendering thread, owned by whoever drives the
/// per-frame sampling loop.
#[derive(Debug)]
pub struct PixelBufferCache {
    opts: BufferCacheOpts,
    stats: BufferCacheStats,
    buffers: HashMap<SizeKey, Vec<u32>>,
    overflow: Vec<u32>,
}

impl Default for PixelBufferCache {
    fn default() -> Self {
        Self::new(BufferCacheOpts::default())
    }
}

impl PixelBufferCache {
    /// Create an empty cache.
    pub fn new(opts: BufferCacheOpts) -> Self {
        Self {
            opts,
            stats: BufferCacheStats::default(),
            buffers: HashMap::new(),
            overflow: Vec::new(),
        }
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> BufferCacheStats {
        self.stats.clone()
    }

    /// Drop every retained buffer, e.g. when the zone layout changes.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.overflow = Vec::new();
        self.stats = BufferCacheStats::default();
    }

    /// Scratch buffer for a `width x height` region.
    ///
    /// The returned slice holds at least `max(width * height, MIN_CHUNK_PIXELS)` pixels. Contents
    /// are whatever the previous user left behind; callers that read past the pixels they wrote
    /// must zero that tail themselves.
    pub fn scratch(&mut self, width: u32, height: u32) -> &mut [u32] {
        let key = SizeKey {
            w: width,
            h: height,
        };
        let len = key.pixel_len();

        if self.buffers.contains_key(&key) {
            self.stats.hits = self.stats.hits.saturating_add(1);
        } else {
            let bytes = key.byte_len();
            if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_cached_bytes {
                self.stats.overflow_uses = self.stats.overflow_uses.saturating_add(1);
                if self.overflow.len() < len {
                    self.overflow.resize(len, 0);
                }
                return &mut self.overflow[..len];
            }

            tracing::debug!(width, height, bytes, "allocating scratch size class");
            self.stats.allocations = self.stats.allocations.saturating_add(1);
            self.stats.retained_buffers = self.stats.retained_buffers.saturating_add(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
        }

        let buf = self.buffers.entry(key).or_insert_with(|| vec![0u32; len]);
        &mut buf[..len]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sample/scratch.rs"]
mod tests;
