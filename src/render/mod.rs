// Render side: texture upload and the full-screen quad, on a dedicated thread.

pub mod cpu;
pub mod error;
pub mod gpu;
pub mod quad;
pub mod renderer;
pub mod thread;

pub use cpu::CpuTarget;
pub use error::RenderError;
pub use renderer::{FrameTarget, RenderStats, Renderer, RendererState, TickOutcome};
pub use thread::{RenderHandle, RenderStatus, RenderThread};
