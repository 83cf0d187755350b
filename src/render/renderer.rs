use std::sync::Arc;

use frame_handoff::FrameSlot;
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::pipeline::frame::{Dimensions, ProcessedFrame};
use crate::render::error::{RenderError, Result};

/// GPU-facing half of the renderer. Implemented by the wgpu target and by
/// in-memory targets in tests.
///
/// Every method is called from the render thread only.
pub trait FrameTarget {
    /// Allocate the frame texture at `extent` and build the quad pipeline.
    fn prepare(&mut self, extent: Dimensions) -> Result<()>;

    /// Overwrite the full texture extent with tightly packed RGBA bytes.
    /// `rgba.len()` is always `extent.rgba_len()`.
    fn upload(&mut self, rgba: &[u8], extent: Dimensions) -> Result<()>;

    /// Draw the textured quad with whatever the texture currently holds.
    fn draw(&mut self) -> Result<()>;

    /// The output surface changed size.
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Drop GPU resources; the surface is gone.
    fn release(&mut self) {}
}

/// Renderer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RendererState {
    Uninitialized,
    SurfaceReady,
    Rendering,
    SurfaceDestroyed,
    /// Setup failed; ticks do nothing until the surface is recreated.
    Degraded,
}

/// What one render tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new frame was uploaded and drawn.
    Uploaded,
    /// No new frame; the previous texture contents were drawn again.
    Held,
    /// The pending frame had the wrong length; the previous contents were
    /// kept and drawn.
    Rejected { expected: usize, actual: usize },
    /// The renderer is not in a drawable state.
    Skipped,
}

/// Counters for the render side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub ticks: u64,
    pub uploads: u64,
    pub rejected: u64,
    pub failed_draws: u64,
}

/// Owns the frame texture through a [`FrameTarget`] and feeds it from the
/// frame slot on every render tick.
pub struct Renderer<T: FrameTarget> {
    target: T,
    slot: Arc<FrameSlot<ProcessedFrame>>,
    extent: Dimensions,
    state: RendererState,
    stats: RenderStats,
}

impl<T: FrameTarget> Renderer<T> {
    /// `extent` is the fixed texture size.
    pub fn new(target: T, slot: Arc<FrameSlot<ProcessedFrame>>, extent: Dimensions) -> Self {
        Self {
            target,
            slot,
            extent,
            state: RendererState::Uninitialized,
            stats: RenderStats::default(),
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn extent(&self) -> Dimensions {
        self.extent
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// The drawing surface exists: allocate the texture and pipeline.
    ///
    /// On failure the renderer is [`RendererState::Degraded`] and the error is
    /// returned; later ticks are skipped.
    pub fn surface_ready(&mut self) -> Result<()> {
        if matches!(self.state, RendererState::SurfaceReady | RendererState::Rendering) {
            return Ok(());
        }
        if self.extent.width == 0 || self.extent.height == 0 {
            self.state = RendererState::Degraded;
            return Err(RenderError::Surface(format!(
                "texture size {} must be non-zero",
                self.extent
            )));
        }
        match self.target.prepare(self.extent) {
            Ok(()) => {
                info!(extent = %self.extent, "renderer surface ready");
                self.state = RendererState::SurfaceReady;
                Ok(())
            }
            Err(e) => {
                error!("renderer setup failed: {e}");
                self.state = RendererState::Degraded;
                Err(e)
            }
        }
    }

    /// The surface was resized.
    pub fn surface_changed(&mut self, width: u32, height: u32) {
        debug!(width, height, "surface changed");
        self.target.resize(width, height);
    }

    /// One render pass: take the pending frame (if any), upload it when it
    /// matches the texture size, then draw.
    pub fn render_tick(&mut self) -> TickOutcome {
        if !matches!(self.state, RendererState::SurfaceReady | RendererState::Rendering) {
            trace!(state = ?self.state, "render tick skipped");
            return TickOutcome::Skipped;
        }
        self.stats.ticks += 1;

        let outcome = match self.slot.consume() {
            None => TickOutcome::Held,
            Some(frame) => {
                let expected = self.extent.rgba_len();
                if frame.data.len() != expected {
                    warn!(
                        expected,
                        actual = frame.data.len(),
                        "rejecting frame with wrong size, keeping previous texture"
                    );
                    self.stats.rejected += 1;
                    TickOutcome::Rejected {
                        expected,
                        actual: frame.data.len(),
                    }
                } else {
                    match self.target.upload(&frame.data, self.extent) {
                        Ok(()) => {
                            self.stats.uploads += 1;
                            TickOutcome::Uploaded
                        }
                        Err(e) => {
                            warn!("texture upload failed: {e}");
                            TickOutcome::Held
                        }
                    }
                }
            }
        };

        if let Err(e) = self.target.draw() {
            warn!("draw failed: {e}");
            self.stats.failed_draws += 1;
        }
        self.state = RendererState::Rendering;
        outcome
    }

    /// The surface is gone: release GPU resources and discard any pending
    /// frame. A later [`surface_ready`](Self::surface_ready) starts over.
    pub fn surface_destroyed(&mut self) {
        self.target.release();
        self.slot.clear();
        self.state = RendererState::SurfaceDestroyed;
        info!("renderer surface destroyed");
    }
}
