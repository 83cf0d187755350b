use thiserror::Error;

/// Capture source errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture source closed")]
    Closed,

    #[error("device busy: {0}")]
    Busy(String),

    #[error("capture source failed: {0}")]
    Source(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;
