use thiserror::Error;

/// Input-contract violations detected by the pixel-format converter.
///
/// These are fatal for the frame being converted; the caller drops it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("dimensions must be even and non-zero, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("expected 2 or 3 planes, got {0}")]
    PlaneCount(usize),

    #[error("{plane} plane has invalid strides (row {row_stride}, pixel {pixel_stride})")]
    InvalidStride {
        plane: &'static str,
        row_stride: usize,
        pixel_stride: usize,
    },

    #[error("{plane} plane too short: need {required} bytes, have {actual}")]
    PlaneTooShort {
        plane: &'static str,
        required: usize,
        actual: usize,
    },
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Failures starting or running a pipeline session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}
