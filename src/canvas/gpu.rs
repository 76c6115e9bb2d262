use std::sync::Arc;

use vello::peniko::{BlendMode, Compose, Fill, Mix};

use crate::canvas::brush::Brush;
use crate::canvas::mask::ClipMask;
use crate::canvas::readback::{HostSurface, ReadbackBridge, ReadbackSource, ReadbackState};
use crate::canvas::{BackendKind, CanvasBackend, CanvasSettings, narrow_clip};
use crate::foundation::core::{Affine, BezPath, IntRect, Rect};
use crate::foundation::error::{ZonelightError, ZonelightResult};
use crate::foundation::math::premultiply;
use crate::sample::reader::BitmapReader;

/// wgpu device and queue shared by GPU canvases.
#[derive(Debug)]
pub struct GpuContext {
    device: vello::wgpu::Device,
    queue: vello::wgpu::Queue,
}

impl GpuContext {
    /// Open the high-performance adapter. Fails with [`ZonelightError::Unavailable`] when the
    /// machine has none.
    #[tracing::instrument]
    pub fn new() -> ZonelightResult<Self> {
        let instance = vello::wgpu::Instance::new(&vello::wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(
            &vello::wgpu::RequestAdapterOptions {
                power_preference: vello::wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            },
        ))
        .map_err(|e| match e {
            vello::wgpu::RequestAdapterError::NotFound { .. } => {
                ZonelightError::unavailable("no gpu adapter available")
            }
            other => ZonelightError::gpu(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) =
            pollster::block_on(adapter.request_device(&vello::wgpu::DeviceDescriptor {
                label: Some("zonelight"),
                required_features: vello::wgpu::Features::empty(),
                required_limits: vello::wgpu::Limits::default(),
                experimental_features: vello::wgpu::ExperimentalFeatures::default(),
                memory_hints: vello::wgpu::MemoryHints::Performance,
                trace: vello::wgpu::Trace::Off,
            }))
            .map_err(|e| ZonelightError::gpu(format!("wgpu request_device failed: {e:?}")))?;

        tracing::debug!(adapter = ?adapter.get_info().name, "gpu context ready");
        Ok(Self { device, queue })
    }
}

/// Render target, scene and readback buffer of one GPU canvas.
struct GpuTarget {
    ctx: Arc<GpuContext>,
    renderer: vello::Renderer,
    scene: vello::Scene,
    width: u32,
    height: u32,
    texture: vello::wgpu::Texture,
    view: vello::wgpu::TextureView,
    readback: vello::wgpu::Buffer,
    padded_row_bytes: u32,
}

impl GpuTarget {
    fn new(ctx: Arc<GpuContext>, width: u32, height: u32) -> ZonelightResult<Self> {
        let device = &ctx.device;
        let renderer = vello::Renderer::new(device, vello::RendererOptions::default())
            .map_err(|e| ZonelightError::gpu(format!("vello renderer init failed: {e:?}")))?;

        let texture = device.create_texture(&vello::wgpu::TextureDescriptor {
            label: Some("zonelight_canvas"),
            size: vello::wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: vello::wgpu::TextureDimension::D2,
            format: vello::wgpu::TextureFormat::Rgba8Unorm,
            usage: vello::wgpu::TextureUsages::STORAGE_BINDING
                | vello::wgpu::TextureUsages::TEXTURE_BINDING
                | vello::wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&vello::wgpu::TextureViewDescriptor::default());

        let row_bytes = width
            .checked_mul(4)
            .ok_or_else(|| ZonelightError::validation("render target width overflow"))?;
        let padded_row_bytes = align_to(row_bytes, vello::wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer_size = u64::from(padded_row_bytes)
            .checked_mul(u64::from(height))
            .ok_or_else(|| ZonelightError::validation("readback buffer size overflow"))?;
        let readback = device.create_buffer(&vello::wgpu::BufferDescriptor {
            label: Some("zonelight_readback"),
            size: buffer_size,
            usage: vello::wgpu::BufferUsages::MAP_READ | vello::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            ctx,
            renderer,
            scene: vello::Scene::new(),
            width,
            height,
            texture,
            view,
            readback,
            padded_row_bytes,
        })
    }
}

impl ReadbackSource for GpuTarget {
    fn read_back(&mut self, dst: &mut HostSurface) -> ZonelightResult<()> {
        if dst.width() != self.width || dst.height() != self.height {
            return Err(ZonelightError::readback(format!(
                "host surface is {}x{}, render target is {}x{}",
                dst.width(),
                dst.height(),
                self.width,
                self.height
            )));
        }
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;

        self.renderer
            .render_to_texture(
                device,
                queue,
                &self.scene,
                &self.view,
                &vello::RenderParams {
                    base_color: vello::peniko::Color::from_rgba8(0, 0, 0, 0),
                    width: self.width,
                    height: self.height,
                    antialiasing_method: vello::AaConfig::Area,
                },
            )
            .map_err(|e| ZonelightError::gpu(format!("vello render failed: {e:?}")))?;

        let mut encoder = device.create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
            label: Some("zonelight_readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            vello::wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: vello::wgpu::Origin3d::ZERO,
                aspect: vello::wgpu::TextureAspect::All,
            },
            vello::wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: vello::wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            vello::wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(Some(encoder.finish()));

        let buffer_slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(vello::wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        device
            .poll(vello::wgpu::PollType::wait_indefinitely())
            .map_err(|e| ZonelightError::readback(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| ZonelightError::readback("readback channel closed"))?
            .map_err(|e| ZonelightError::readback(format!("readback map failed: {e:?}")))?;

        {
            let mapped = buffer_slice.get_mapped_range();
            let row_bytes = self.width as usize * 4;
            let padded = self.padded_row_bytes as usize;
            for y in 0..self.height {
                let start = y as usize * padded;
                dst.row_mut(y)
                    .copy_from_slice(&mapped[start..start + row_bytes]);
            }
        }
        self.readback.unmap();
        Ok(())
    }
}

/// `vello` canvas rendered on the GPU.
///
/// Draw calls append to a retained [`vello::Scene`] and invalidate the [`ReadbackBridge`];
/// sampling renders the scene and copies it to host memory only when something changed.
pub struct GpuCanvas {
    target: GpuTarget,
    bridge: ReadbackBridge,
    transform: Affine,
    clip: IntRect,
}

impl std::fmt::Debug for GpuCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuCanvas")
            .field("width", &self.target.width)
            .field("height", &self.target.height)
            .field("readback", &self.bridge.state())
            .field("transform", &self.transform)
            .field("clip", &self.clip)
            .finish_non_exhaustive()
    }
}

impl GpuCanvas {
    /// Transparent `width x height` canvas on `ctx`.
    pub fn new(
        ctx: Arc<GpuContext>,
        width: u32,
        height: u32,
        _settings: &CanvasSettings,
    ) -> ZonelightResult<Self> {
        if width == 0 || height == 0 {
            return Err(ZonelightError::validation("gpu canvas size must be non-zero"));
        }
        Ok(Self {
            target: GpuTarget::new(ctx, width, height)?,
            bridge: ReadbackBridge::new(width, height)?,
            transform: Affine::IDENTITY,
            clip: IntRect::from_size(width, height),
        })
    }

    /// Whether the host copy is current.
    pub fn readback_state(&self) -> ReadbackState {
        self.bridge.state()
    }

    /// Completed GPU-to-host copies.
    pub fn readback_count(&self) -> u64 {
        self.bridge.readback_count()
    }

    /// Make the host copy current.
    pub fn ensure_readback(&mut self) -> ZonelightResult<&HostSurface> {
        self.bridge.ensure(&mut self.target)
    }

    pub(crate) fn reader(&mut self) -> ZonelightResult<BitmapReader<'_>> {
        let host = self.bridge.ensure(&mut self.target)?;
        BitmapReader::premultiplied(
            BackendKind::Gpu,
            host.bytes(),
            host.width(),
            host.height(),
            host.stride_bytes(),
        )
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.target.width),
            f64::from(self.target.height),
        )
    }

    /// Record `draw` inside the current clip and invalidate the host copy.
    fn record(&mut self, draw: impl FnOnce(&mut vello::Scene)) {
        if self.clip.is_empty() {
            return;
        }
        let clipped = self.clip != IntRect::from_size(self.target.width, self.target.height);
        let scene = &mut self.target.scene;
        if clipped {
            scene.push_layer(
                Fill::NonZero,
                BlendMode::default(),
                1.0,
                Affine::IDENTITY,
                &self.clip.to_rect(),
            );
        }
        draw(scene);
        if clipped {
            scene.pop_layer();
        }
        self.bridge.invalidate();
    }

    /// Upload straight RGBA8 bytes of the canvas size as the bottom-most image.
    pub(crate) fn load_straight_rgba(&mut self, rgba: &[u8]) -> ZonelightResult<()> {
        let (w, h) = (self.target.width, self.target.height);
        if rgba.len() != w as usize * h as usize * 4 {
            return Err(ZonelightError::validation("image byte length mismatch"));
        }
        let premul: Vec<u8> = rgba
            .chunks_exact(4)
            .flat_map(|px| premultiply([px[0], px[1], px[2], px[3]]))
            .collect();
        let image = premul_image(premul, w, h);
        self.record(|scene| scene.draw_image(&image, Affine::IDENTITY));
        Ok(())
    }

    pub(crate) fn blit_from(
        &mut self,
        src: &mut GpuCanvas,
        dest: Rect,
        opacity: f32,
    ) -> ZonelightResult<()> {
        if opacity <= 0.0 || !(dest.width() > 0.0 && dest.height() > 0.0) {
            return Ok(());
        }
        let host = src.ensure_readback()?;
        let (sw, sh) = (host.width(), host.height());
        let image = premul_image(host.bytes().to_vec(), sw, sh);
        let map = self.transform
            * Affine::translate(dest.origin().to_vec2())
            * Affine::scale_non_uniform(dest.width() / f64::from(sw), dest.height() / f64::from(sh));
        let bounds = self.bounds();
        self.record(|scene| {
            if opacity < 1.0 {
                scene.push_layer(
                    Fill::NonZero,
                    BlendMode::default(),
                    opacity,
                    Affine::IDENTITY,
                    &bounds,
                );
            }
            scene.draw_image(&image, map);
            if opacity < 1.0 {
                scene.pop_layer();
            }
        });
        Ok(())
    }

    fn apply_mask(&mut self, mask: &ClipMask, compose: Compose) {
        if mask.is_degenerate() {
            return;
        }
        let path = mask.to_path();
        let bounds = self.bounds();
        let opaque = vello::peniko::Color::from_rgba8(0, 0, 0, 255);
        let scene = &mut self.target.scene;
        match compose {
            // Layer clipped to the mask whose content punches out the backdrop.
            Compose::DestOut => {
                scene.push_layer(
                    Fill::NonZero,
                    BlendMode::new(Mix::Normal, Compose::DestOut),
                    1.0,
                    Affine::IDENTITY,
                    &path,
                );
                scene.fill(Fill::NonZero, Affine::IDENTITY, opaque, None, &bounds);
            }
            // Full-canvas layer that keeps the backdrop only where the mask is painted.
            _ => {
                scene.push_layer(
                    Fill::NonZero,
                    BlendMode::new(Mix::Normal, Compose::DestIn),
                    1.0,
                    Affine::IDENTITY,
                    &bounds,
                );
                scene.fill(Fill::NonZero, Affine::IDENTITY, opaque, None, &path);
            }
        }
        scene.pop_layer();
        self.bridge.invalidate();
    }
}

impl CanvasBackend for GpuCanvas {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn width(&self) -> u32 {
        self.target.width
    }

    fn height(&self) -> u32 {
        self.target.height
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn fill_path(&mut self, brush: &Brush, path: &BezPath) {
        if brush.is_invisible() {
            return;
        }
        let paint = vello_brush(brush);
        let transform = self.transform;
        self.record(|scene| scene.fill(Fill::NonZero, transform, &paint, None, path));
    }

    fn stroke_path(&mut self, brush: &Brush, path: &BezPath, width: f64) {
        if brush.is_invisible() || !(width.is_finite() && width > 0.0) {
            return;
        }
        let paint = vello_brush(brush);
        let transform = self.transform;
        let style = kurbo::Stroke::new(width);
        self.record(|scene| scene.stroke(&style, transform, &paint, None, path));
    }

    fn clear(&mut self) {
        self.target.scene.reset();
        self.bridge.mark_cleared();
    }

    fn reset(&mut self) {
        self.transform = Affine::IDENTITY;
        self.clip = IntRect::from_size(self.target.width, self.target.height);
    }

    fn set_clip(&mut self, region: Rect) {
        self.clip = narrow_clip(self.clip, region);
    }

    fn exclude_region(&mut self, mask: &ClipMask) {
        self.apply_mask(mask, Compose::DestOut);
    }

    fn include_only_region(&mut self, mask: &ClipMask) {
        self.apply_mask(mask, Compose::DestIn);
    }
}

fn vello_brush(brush: &Brush) -> vello::peniko::Brush {
    let color = |c: crate::foundation::core::Color| vello::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a);
    match brush {
        Brush::Solid(c) => vello::peniko::Brush::Solid(color(*c)),
        Brush::Linear(g) => vello::peniko::Brush::Gradient(
            vello::peniko::Gradient::new_linear(g.start, g.end)
                .with_stops([color(g.start_color), color(g.end_color)]),
        ),
    }
}

fn premul_image(bytes: Vec<u8>, width: u32, height: u32) -> vello::peniko::ImageData {
    vello::peniko::ImageData {
        data: vello::peniko::Blob::from(bytes),
        format: vello::peniko::ImageFormat::Rgba8,
        alpha_type: vello::peniko::ImageAlphaType::AlphaPremultiplied,
        width,
        height,
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/gpu.rs"]
mod tests;
