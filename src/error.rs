//! Error types for the frame and detection paths.
//!
//! Nothing here is fatal to the frame loop: the simulation context catches
//! these, logs them and falls back to an empty detection set.

use thiserror::Error;

/// Problems with a pixel buffer handed to the pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has zero size ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected} for an RGBA frame")]
    BufferSize { expected: usize, actual: usize },
}

/// Why a detection request produced no result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("capture device is not ready")]
    NotReady,

    #[error("detector model is not loaded")]
    NotLoaded,

    #[error("detection failed: {0}")]
    Failed(String),

    #[error("detection worker has shut down")]
    WorkerGone,
}

impl From<FrameError> for DetectionError {
    fn from(e: FrameError) -> Self {
        DetectionError::Failed(e.to_string())
    }
}
