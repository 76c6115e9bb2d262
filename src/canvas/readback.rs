use crate::foundation::error::{ZonelightError, ZonelightResult};

/// Whether the host copy of a GPU surface is current.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadbackState {
    /// Host pixels match the GPU surface.
    Valid,
    /// A draw call happened since the last readback.
    Invalidated,
}

/// Host-visible premultiplied RGBA8 copy of a GPU surface, allocated once per canvas.
#[derive(Clone, Debug)]
pub struct HostSurface {
    width: u32,
    height: u32,
    stride_bytes: usize,
    data: Vec<u8>,
}

impl HostSurface {
    /// Tightly packed, fully transparent surface.
    pub fn new(width: u32, height: u32) -> ZonelightResult<Self> {
        let stride_bytes = (width as usize)
            .checked_mul(4)
            .ok_or_else(|| ZonelightError::validation("host surface width overflow"))?;
        let len = stride_bytes
            .checked_mul(height as usize)
            .ok_or_else(|| ZonelightError::validation("host surface size overflow"))?;
        Ok(Self {
            width,
            height,
            stride_bytes,
            data: vec![0; len],
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }

    /// Premultiplied RGBA8 bytes, row-major.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable premultiplied RGBA8 bytes, row-major.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Mutable bytes of row `y`.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride_bytes;
        &mut self.data[start..start + self.width as usize * 4]
    }
}

/// Something that can copy its rendered pixels into a [`HostSurface`].
///
/// The wgpu render target implements this in production; tests inject counting stubs.
pub trait ReadbackSource {
    /// Flush outstanding work and block until `dst` holds the current pixels.
    fn read_back(&mut self, dst: &mut HostSurface) -> ZonelightResult<()>;
}

/// Invalidation-tracked host copy of a GPU surface.
///
/// Draw calls move the bridge to [`ReadbackState::Invalidated`]; [`ReadbackBridge::ensure`]
/// performs the copy only from that state, so repeated sampling without intervening draws
/// costs one readback.
#[derive(Debug)]
pub struct ReadbackBridge {
    state: ReadbackState,
    host: HostSurface,
    readbacks: u64,
}

impl ReadbackBridge {
    /// Bridge for a freshly constructed, fully transparent surface.
    pub fn new(width: u32, height: u32) -> ZonelightResult<Self> {
        Ok(Self {
            state: ReadbackState::Valid,
            host: HostSurface::new(width, height)?,
            readbacks: 0,
        })
    }

    /// Current state.
    pub fn state(&self) -> ReadbackState {
        self.state
    }

    /// Number of completed copies.
    pub fn readback_count(&self) -> u64 {
        self.readbacks
    }

    /// Record that the GPU surface changed.
    pub fn invalidate(&mut self) {
        self.state = ReadbackState::Invalidated;
    }

    /// Record that the GPU surface was cleared to transparent; no copy is needed to know that.
    pub fn mark_cleared(&mut self) {
        self.host.bytes_mut().fill(0);
        self.state = ReadbackState::Valid;
    }

    /// Make the host copy current and return it.
    ///
    /// On failure the bridge stays invalidated and the error is returned; the host copy is
    /// not handed out.
    #[tracing::instrument(skip(self, source), fields(state = ?self.state))]
    pub fn ensure(&mut self, source: &mut dyn ReadbackSource) -> ZonelightResult<&HostSurface> {
        if self.state == ReadbackState::Invalidated {
            if let Err(e) = source.read_back(&mut self.host) {
                tracing::warn!(error = %e, "readback failed");
                return Err(e);
            }
            self.readbacks += 1;
            self.state = ReadbackState::Valid;
        }
        Ok(&self.host)
    }

    /// Last host copy, which may be stale.
    pub fn host(&self) -> &HostSurface {
        &self.host
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/readback.rs"]
mod tests;
