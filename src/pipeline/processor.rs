use std::panic::{self, AssertUnwindSafe};

use crate::pipeline::convert::nv21_to_rgba;
use crate::pipeline::frame::{CanonicalFrame, ProcessedFrame};

/// Why a processor produced nothing for a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOutput {
    /// The processing runtime has not been initialised.
    NotReady,
    /// Dimensions the processor cannot handle.
    Unsupported(String),
    /// The processor returned an empty buffer.
    Empty,
    /// The processor failed internally (including panics).
    Failed(String),
}

impl std::fmt::Display for NoOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoOutput::NotReady => write!(f, "processing runtime not ready"),
            NoOutput::Unsupported(reason) => write!(f, "unsupported input: {reason}"),
            NoOutput::Empty => write!(f, "empty output"),
            NoOutput::Failed(reason) => write!(f, "processing failed: {reason}"),
        }
    }
}

/// Result of one processor call. "No output" is a normal outcome: the
/// driver skips the frame and carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Frame(ProcessedFrame),
    NoOutput(NoOutput),
}

impl ProcessOutcome {
    pub fn frame(self) -> Option<ProcessedFrame> {
        match self {
            ProcessOutcome::Frame(frame) => Some(frame),
            ProcessOutcome::NoOutput(_) => None,
        }
    }
}

/// The image-processing stage.
///
/// Called from one thread at a time, synchronously, once per frame. The input
/// is borrowed for the call only and must not be retained. Output, when
/// present, is `width*height*4` RGBA bytes.
pub trait FrameProcessor: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn process(&mut self, frame: &CanonicalFrame) -> ProcessOutcome;
}

/// Run `processor` on `frame`, folding panics and empty buffers into
/// [`NoOutput`] so nothing unwinds into the pipeline.
pub fn process_guarded(
    processor: &mut dyn FrameProcessor,
    frame: &CanonicalFrame,
) -> ProcessOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| processor.process(frame)));
    match result {
        Ok(ProcessOutcome::Frame(out)) if out.is_empty() => ProcessOutcome::NoOutput(NoOutput::Empty),
        Ok(outcome) => outcome,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            ProcessOutcome::NoOutput(NoOutput::Failed(reason))
        }
    }
}

/// Decodes the camera frame to colour without further processing.
///
/// Backs the raw preview mode.
#[derive(Debug, Default)]
pub struct ColorPassthrough;

impl FrameProcessor for ColorPassthrough {
    fn name(&self) -> &'static str {
        "color-passthrough"
    }

    fn process(&mut self, frame: &CanonicalFrame) -> ProcessOutcome {
        ProcessOutcome::Frame(ProcessedFrame::new(
            nv21_to_rgba(frame),
            frame.width(),
            frame.height(),
        ))
    }
}

/// Process-wide readiness of the processing runtime.
///
/// Written once at startup; read-only afterwards from every thread.
pub mod runtime {
    use std::sync::OnceLock;

    use tracing::{error, info};

    static READY: OnceLock<bool> = OnceLock::new();

    /// Run `init` once and record whether it succeeded. Later calls return
    /// the recorded state without running their closure.
    pub fn initialise<E: std::fmt::Display>(init: impl FnOnce() -> Result<(), E>) -> bool {
        *READY.get_or_init(|| match init() {
            Ok(()) => {
                info!("processing runtime ready");
                true
            }
            Err(e) => {
                error!("processing runtime failed to initialise: {e}");
                false
            }
        })
    }

    /// Whether the runtime initialised successfully.
    pub fn is_ready() -> bool {
        READY.get().copied().unwrap_or(false)
    }
}
