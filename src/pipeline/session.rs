use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{error, info};

use crate::camera::backend::CaptureSource;
use crate::diagnostics::stats::{PipelineStats, TelemetryReport, TelemetrySnapshot};
use crate::pipeline::error::SessionError;
use crate::pipeline::worker::{FrameWorker, ModeSwitch};

/// Callback type for reporting capture errors to the UI context.
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Active pipeline session: one worker thread pulling frames from a capture
/// source and driving them through a [`FrameWorker`].
pub struct PipelineSession {
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    stats: Arc<Mutex<PipelineStats>>,
    mode: Arc<ModeSwitch>,
}

impl PipelineSession {
    /// Spawn the worker thread and start pulling frames.
    ///
    /// If `on_error` is provided, it is called with the error message when
    /// the capture source fails. The session ends when the source is
    /// exhausted, fails, or [`stop`](Self::stop) is called.
    pub fn start(
        mut source: Box<dyn CaptureSource>,
        mut worker: FrameWorker,
        on_error: Option<ErrorCallback>,
    ) -> Result<Self, SessionError> {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = worker.stats();
        let mode = worker.mode();

        let thread = {
            let running = Arc::clone(&running);
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name("frame-worker".to_string())
                .spawn(move || {
                    let (width, height) = source.dimensions();
                    info!(width, height, "frame worker starting");
                    let mut frames = 0u64;
                    while !shutdown.load(Ordering::Acquire) {
                        let next = source.next_frame(&mut |raw| {
                            worker.handle_frame(raw);
                        });
                        match next {
                            Ok(true) => frames += 1,
                            Ok(false) => {
                                info!(frames, "capture source exhausted");
                                break;
                            }
                            Err(e) => {
                                error!("capture failed after {frames} frames: {e}");
                                if let Some(cb) = &on_error {
                                    cb(&e.to_string());
                                }
                                break;
                            }
                        }
                    }
                    source.close();
                    running.store(false, Ordering::Release);
                    info!(frames, "frame worker exiting");
                })
                .map_err(|source| SessionError::Spawn {
                    thread: "frame-worker",
                    source,
                })?
        };

        Ok(Self {
            running,
            shutdown,
            thread: Some(thread),
            stats,
            mode,
        })
    }

    /// Whether the worker is still pulling frames.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Shared preview mode; flip it from any thread.
    pub fn mode(&self) -> &Arc<ModeSwitch> {
        &self.mode
    }

    /// Take a snapshot of telemetry for this session.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.stats.lock().snapshot()
    }

    /// Latest telemetry line.
    pub fn report(&self) -> TelemetryReport {
        self.stats.lock().report()
    }

    /// Block until the worker finishes on its own (source exhausted or
    /// failed).
    pub fn wait(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("frame worker panicked");
            }
        }
    }

    /// Stop the session. Idempotent: calling stop twice does not panic.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.wait();
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for PipelineSession {
    fn drop(&mut self) {
        self.stop();
    }
}
