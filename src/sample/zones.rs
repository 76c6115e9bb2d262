use crate::canvas::{BackendKind, Canvas};
use crate::foundation::core::{AlphaMode, Color, IntRect};
use crate::foundation::error::{ZonelightError, ZonelightResult};
use crate::sample::reader::BitmapReader;
use crate::sample::reduce::Reducer;
use crate::sample::scratch::{BufferCacheOpts, BufferCacheStats, PixelBufferCache};

/// Identifier of one addressable lighting element (a key, a mouse zone, ...).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

/// One zone and the canvas rectangle it samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Zone {
    /// Zone identifier.
    pub id: ZoneId,
    /// Sampled rectangle in canvas pixels.
    pub rect: IntRect,
}

/// Ordered zone layout supplied by the layout loader. Read-only during a frame.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZoneMap {
    zones: Vec<Zone>,
}

impl ZoneMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from zones in sampling order. Duplicate ids are rejected.
    pub fn from_zones(zones: impl IntoIterator<Item = Zone>) -> ZonelightResult<Self> {
        let mut map = Self::new();
        for z in zones {
            if map.get(z.id).is_some() {
                return Err(ZonelightError::validation(format!(
                    "duplicate zone id {}",
                    z.id.0
                )));
            }
            map.zones.push(z);
        }
        Ok(map)
    }

    /// Parse a `{"zones": [{"id": .., "rect": {..}}, ..]}` document.
    pub fn from_json(json: &str) -> ZonelightResult<Self> {
        let raw: Self = serde_json::from_str(json).map_err(|e| ZonelightError::serde(e.to_string()))?;
        Self::from_zones(raw.zones)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> ZonelightResult<String> {
        serde_json::to_string(self).map_err(|e| ZonelightError::serde(e.to_string()))
    }

    /// Set the rectangle for `id`, appending the zone if it is new.
    pub fn insert(&mut self, id: ZoneId, rect: IntRect) {
        match self.zones.iter_mut().find(|z| z.id == id) {
            Some(z) => z.rect = rect,
            None => self.zones.push(Zone { id, rect }),
        }
    }

    /// Rectangle of `id`.
    pub fn get(&self, id: ZoneId) -> Option<IntRect> {
        self.zones.iter().find(|z| z.id == id).map(|z| z.rect)
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// True when there are no zones.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zones in sampling order.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }
}

/// Per-frame sampling output, `zone id -> colour`, in zone-map order.
///
/// Reused across frames; clearing keeps the allocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ZoneColors {
    entries: Vec<(ZoneId, Color)>,
}

impl ZoneColors {
    /// Empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Colour sampled for `id`.
    pub fn get(&self, id: ZoneId) -> Option<Color> {
        self.entries.iter().find(|(z, _)| *z == id).map(|(_, c)| *c)
    }

    /// Number of sampled zones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was sampled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(zone, colour)` pairs in zone-map order.
    pub fn as_slice(&self) -> &[(ZoneId, Color)] {
        &self.entries
    }

    /// Iterate `(zone, colour)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ZoneId, Color)> + '_ {
        self.entries.iter().copied()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Sample every zone of `zones` from `reader` into `out` with the detected reducer.
pub fn sample_zones(
    reader: &BitmapReader<'_>,
    zones: &ZoneMap,
    mode: AlphaMode,
    cache: &mut PixelBufferCache,
    out: &mut ZoneColors,
) {
    sample_zones_with(reader, zones, mode, cache, Reducer::detect(), out);
}

/// [`sample_zones`] with an explicit reducer.
pub fn sample_zones_with(
    reader: &BitmapReader<'_>,
    zones: &ZoneMap,
    mode: AlphaMode,
    cache: &mut PixelBufferCache,
    reducer: Reducer,
    out: &mut ZoneColors,
) {
    out.clear();
    out.entries.reserve(zones.len());
    for z in zones.iter() {
        let c = reader.region_color_with(z.rect, mode, cache, reducer);
        out.entries.push((z.id, c));
    }
}

/// Sampling configuration, usually loaded from JSON.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Backend the sampled canvases are expected to use.
    pub backend: BackendKind,
    /// Averaging mode for zone colours.
    pub alpha_mode: AlphaMode,
    /// Scratch buffer retention.
    pub buffer_cache: BufferCacheOpts,
    /// Always use the scalar reducer.
    pub force_scalar: bool,
}

impl SamplerSettings {
    /// Parse settings; missing fields take their defaults.
    pub fn from_json(json: &str) -> ZonelightResult<Self> {
        serde_json::from_str(json).map_err(|e| ZonelightError::serde(e.to_string()))
    }

    /// Reducer these settings select on this machine.
    pub fn reducer(&self) -> Reducer {
        if self.force_scalar {
            Reducer::Scalar
        } else {
            Reducer::detect()
        }
    }
}

/// Per-frame zone sampling loop for one rendering pipeline.
///
/// Owns the scratch buffer cache and the output set, so steady-state frames do not allocate.
/// A sampler is not shared between threads; concurrent pipelines each own one.
#[derive(Debug)]
pub struct ZoneSampler {
    backend: BackendKind,
    mode: AlphaMode,
    reducer: Reducer,
    cache: PixelBufferCache,
    out: ZoneColors,
}

impl ZoneSampler {
    /// Sampler configured by `settings`.
    pub fn new(settings: &SamplerSettings) -> Self {
        Self {
            backend: settings.backend,
            mode: settings.alpha_mode,
            reducer: settings.reducer(),
            cache: PixelBufferCache::new(settings.buffer_cache),
            out: ZoneColors::new(),
        }
    }

    /// Backend this sampler accepts.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Averaging mode in use.
    pub fn alpha_mode(&self) -> AlphaMode {
        self.mode
    }

    /// Change the averaging mode.
    pub fn set_alpha_mode(&mut self, mode: AlphaMode) {
        self.mode = mode;
    }

    /// Reducer in use.
    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    /// Scratch cache statistics.
    pub fn cache_stats(&self) -> BufferCacheStats {
        self.cache.stats()
    }

    /// Drop retained scratch buffers. Call when the zone layout changes.
    pub fn on_layout_change(&mut self) {
        self.cache.clear();
    }

    /// Sample every zone of `zones` from `canvas`.
    ///
    /// Flushes pending vector work or reads back GPU pixels first. Fails when the canvas belongs
    /// to a different backend than the sampler or the GPU readback fails.
    #[tracing::instrument(skip(self, canvas, zones), fields(zones = zones.len()))]
    pub fn sample(&mut self, canvas: &mut Canvas, zones: &ZoneMap) -> ZonelightResult<&ZoneColors> {
        let reader = canvas.reader()?;
        reader.expect_kind(self.backend)?;
        sample_zones_with(&reader, zones, self.mode, &mut self.cache, self.reducer, &mut self.out);
        Ok(&self.out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sample/zones.rs"]
mod tests;
