use thiserror::Error;

/// Render-side failures. Setup errors leave the renderer degraded; the rest
/// of the pipeline keeps running.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter: {0}")]
    AdapterUnavailable(String),

    #[error("failed to create GPU device: {0}")]
    DeviceUnavailable(String),

    #[error("shader failed to compile: {0}")]
    ShaderCompile(String),

    #[error("shader failed to link: {0}")]
    ShaderLink(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("renderer not ready")]
    NotReady,

    #[error("render thread is gone")]
    ThreadGone,

    #[error("failed to spawn render thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, RenderError>;
