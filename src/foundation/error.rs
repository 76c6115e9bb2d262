use crate::canvas::BackendKind;

/// Convenience result type used across zonelight.
pub type ZonelightResult<T> = Result<T, ZonelightError>;

/// Errors surfaced by canvases, readers and the sampling pipeline.
///
/// Degenerate geometry (empty rectangles, rectangles outside the surface, empty masks) is never
/// an error; those cases have defined fallbacks instead.
#[derive(thiserror::Error, Debug)]
pub enum ZonelightError {
    /// Invalid input dimensions, buffer sizes or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// A surface or canvas from one backend was handed to another backend.
    #[error("backend mismatch: expected {expected:?} surface, got {found:?}")]
    BackendMismatch {
        /// Backend the receiving side operates on.
        expected: BackendKind,
        /// Backend that produced the offending surface.
        found: BackendKind,
    },

    /// The requested backend was not compiled in or has no usable device.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// GPU device, renderer or command submission failure.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// Copying GPU pixels into host memory failed; sampled colours would be stale.
    #[error("readback error: {0}")]
    Readback(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ZonelightError {
    /// Build a [`ZonelightError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ZonelightError::BackendMismatch`].
    pub fn backend_mismatch(expected: BackendKind, found: BackendKind) -> Self {
        Self::BackendMismatch { expected, found }
    }

    /// Build a [`ZonelightError::Unavailable`].
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Build a [`ZonelightError::Gpu`].
    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    /// Build a [`ZonelightError::Readback`].
    pub fn readback(msg: impl Into<String>) -> Self {
        Self::Readback(msg.into())
    }

    /// Build a [`ZonelightError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
