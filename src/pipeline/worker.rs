use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use frame_handoff::FrameSlot;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::camera::types::RawFrame;
use crate::diagnostics::stats::{PipelineStats, TelemetryReport};
use crate::pipeline::convert::yuv420_to_nv21;
use crate::pipeline::error::ConvertError;
use crate::pipeline::frame::ProcessedFrame;
use crate::pipeline::processor::{
    process_guarded, runtime, ColorPassthrough, FrameProcessor, NoOutput, ProcessOutcome,
};

/// Asks the render context for one render pass. Must not block.
pub trait RenderRequest: Send + Sync {
    fn request_render(&self);
}

impl<F: Fn() + Send + Sync> RenderRequest for F {
    fn request_render(&self) {
        self()
    }
}

/// Receives every telemetry report (UI context).
pub type TelemetryCallback = Arc<dyn Fn(TelemetryReport) + Send + Sync>;

/// Copy of the most recently published frame, for exports. The render side
/// consumes the slot, so readers other than the renderer look here.
pub type FrameTap = Arc<Mutex<Option<ProcessedFrame>>>;

/// What the preview shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// Frames go through the configured processor.
    #[default]
    Processed,
    /// Frames are colour-decoded and shown as captured.
    Raw,
}

impl std::fmt::Display for PreviewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewMode::Processed => write!(f, "processed"),
            PreviewMode::Raw => write!(f, "raw"),
        }
    }
}

impl std::str::FromStr for PreviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(PreviewMode::Processed),
            "raw" => Ok(PreviewMode::Raw),
            other => Err(format!("unknown preview mode '{other}'")),
        }
    }
}

/// Preview mode shared between the worker and a controlling thread.
#[derive(Debug, Default)]
pub struct ModeSwitch(AtomicU8);

impl ModeSwitch {
    pub fn new(mode: PreviewMode) -> Self {
        let switch = Self::default();
        switch.set(mode);
        switch
    }

    pub fn get(&self) -> PreviewMode {
        match self.0.load(Ordering::Acquire) {
            1 => PreviewMode::Raw,
            _ => PreviewMode::Processed,
        }
    }

    pub fn set(&self, mode: PreviewMode) {
        let value = match mode {
            PreviewMode::Processed => 0,
            PreviewMode::Raw => 1,
        };
        self.0.store(value, Ordering::Release);
    }

    /// Flip between the two modes and return the new one.
    pub fn toggle(&self) -> PreviewMode {
        let next = match self.get() {
            PreviewMode::Processed => PreviewMode::Raw,
            PreviewMode::Raw => PreviewMode::Processed,
        };
        self.set(next);
        next
    }
}

/// What happened to one captured frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Published to the slot and a render pass was requested. Carries the
    /// telemetry report when the FPS window rolled over on this frame.
    Published(Option<TelemetryReport>),
    /// The processor produced nothing; the frame was dropped.
    Skipped(NoOutput),
    /// The converter rejected the raw frame.
    Rejected(ConvertError),
}

/// Per-frame driver: convert, process, publish, request render, account.
///
/// Runs on the capture/processing context, one frame at a time.
pub struct FrameWorker {
    processor: Box<dyn FrameProcessor>,
    passthrough: ColorPassthrough,
    slot: Arc<FrameSlot<ProcessedFrame>>,
    render: Arc<dyn RenderRequest>,
    stats: Arc<Mutex<PipelineStats>>,
    mode: Arc<ModeSwitch>,
    on_telemetry: Option<TelemetryCallback>,
    tap: Option<FrameTap>,
}

impl FrameWorker {
    pub fn new(
        processor: Box<dyn FrameProcessor>,
        slot: Arc<FrameSlot<ProcessedFrame>>,
        render: Arc<dyn RenderRequest>,
        stats: Arc<Mutex<PipelineStats>>,
    ) -> Self {
        Self {
            processor,
            passthrough: ColorPassthrough,
            slot,
            render,
            stats,
            mode: Arc::new(ModeSwitch::default()),
            on_telemetry: None,
            tap: None,
        }
    }

    pub fn with_mode(mut self, mode: Arc<ModeSwitch>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_telemetry_callback(mut self, callback: TelemetryCallback) -> Self {
        self.on_telemetry = Some(callback);
        self
    }

    /// Keep a copy of every published frame in `tap`.
    pub fn with_frame_tap(mut self, tap: FrameTap) -> Self {
        self.tap = Some(tap);
        self
    }

    pub fn mode(&self) -> Arc<ModeSwitch> {
        Arc::clone(&self.mode)
    }

    pub fn stats(&self) -> Arc<Mutex<PipelineStats>> {
        Arc::clone(&self.stats)
    }

    /// Drive one captured frame through the pipeline. `raw` is only
    /// borrowed for the duration of this call.
    pub fn handle_frame(&mut self, raw: &RawFrame<'_>) -> FrameOutcome {
        let canonical = match yuv420_to_nv21(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(width = raw.width, height = raw.height, "dropping frame: {e}");
                self.stats.lock().record_reject();
                return FrameOutcome::Rejected(e);
            }
        };

        let mode = self.mode.get();
        let processor: &mut dyn FrameProcessor = match mode {
            PreviewMode::Processed => {
                if !runtime::is_ready() {
                    debug!("processing runtime not ready, skipping frame");
                    self.stats.lock().record_skip();
                    return FrameOutcome::Skipped(NoOutput::NotReady);
                }
                self.processor.as_mut()
            }
            PreviewMode::Raw => &mut self.passthrough,
        };

        let started = Instant::now();
        let outcome = process_guarded(processor, &canonical);
        let elapsed = started.elapsed();

        let processed = match outcome {
            ProcessOutcome::Frame(frame) => frame,
            ProcessOutcome::NoOutput(reason) => {
                debug!(processor = processor.name(), "no output: {reason}");
                self.stats.lock().record_skip();
                return FrameOutcome::Skipped(reason);
            }
        };

        trace!(
            processor = processor.name(),
            %mode,
            bytes = processed.data.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "frame processed"
        );

        if let Some(tap) = &self.tap {
            *tap.lock() = Some(processed.clone());
        }
        self.slot.publish(processed);
        self.render.request_render();

        let report = self.stats.lock().record_frame(elapsed, Instant::now());
        if let Some(report) = report {
            info!("{report}");
            if let Some(callback) = &self.on_telemetry {
                callback(report);
            }
        }
        FrameOutcome::Published(report)
    }
}
