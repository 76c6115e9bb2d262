//! Zonelight turns rendered lighting canvases into one colour per device zone.
//!
//! Effect code draws into a [`Canvas`] (software raster, `vello_cpu` vector surface, or a
//! `vello` GPU surface behind the `gpu` feature). Every frame a [`ZoneSampler`] reduces each
//! zone rectangle of a [`ZoneMap`] to its average colour:
//!
//! - [`Canvas`] receives fills, strokes, blits and exclusion/inclusion masks
//! - [`Canvas::reader`] yields a [`BitmapReader`] over the frame's pixels
//! - the region reducer sums pixels with a scalar or AVX2 kernel, reusing scratch buffers from
//!   a [`PixelBufferCache`]
#![deny(unsafe_code)]
#![deny(missing_docs)]

mod canvas;
mod foundation;
mod sample;

pub use canvas::brush::{Brush, LinearGradient};
#[cfg(feature = "gpu")]
pub use canvas::gpu::{GpuCanvas, GpuContext};
pub use canvas::mask::ClipMask;
pub use canvas::readback::{HostSurface, ReadbackBridge, ReadbackSource, ReadbackState};
pub use canvas::{BackendKind, Canvas, CanvasBackend, CanvasSettings};
pub use foundation::core::{
    Affine, AlphaMode, BezPath, Color, Ellipse, IntRect, Line, Point, Rect, Vec2,
};
pub use foundation::error::{ZonelightError, ZonelightResult};
pub use sample::reader::BitmapReader;
pub use sample::reduce::{
    ChannelSums, FORCE_SCALAR_ENV, Reducer, SIMD_BATCH_PIXELS, SIMD_MAX_AREA, SurfaceView,
    average_color, average_color_with,
};
pub use sample::scratch::{BufferCacheOpts, BufferCacheStats, MIN_CHUNK_PIXELS, PixelBufferCache};
pub use sample::zones::{
    SamplerSettings, Zone, ZoneColors, ZoneId, ZoneMap, ZoneSampler, sample_zones,
    sample_zones_with,
};
