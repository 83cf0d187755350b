pub mod camera;
pub mod diagnostics;
pub mod export;
pub mod pipeline;
pub mod render;
pub mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use frame_handoff::FrameSlot;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use camera::error::CaptureError;
use camera::synthetic::{SyntheticConfig, SyntheticLayout, SyntheticSource};
use diagnostics::stats::{PipelineStats, TelemetryReport, TelemetrySnapshot};
use export::{ExportError, ViewerFrame};
use pipeline::edges::CannyEdgeDetector;
use pipeline::error::SessionError;
use pipeline::processor::runtime;
use pipeline::session::{ErrorCallback, PipelineSession};
use pipeline::worker::{FrameTap, FrameWorker, ModeSwitch, PreviewMode, TelemetryCallback};
use render::error::RenderError;
use render::gpu::GpuTarget;
use render::thread::{RenderStatus, RenderThread};
use render::CpuTarget;
use settings::{PipelineSettings, SettingsError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("no frame was published, nothing to export")]
    NothingToExport,
}

/// One run of the synthetic source through the whole pipeline.
pub struct RunOptions {
    pub settings: PipelineSettings,
    /// Stop after this many captured frames. `None` runs until stopped.
    pub frames: Option<u64>,
    pub mode: PreviewMode,
    pub layout: SyntheticLayout,
    /// Render on a headless GPU adapter instead of in memory.
    pub gpu: bool,
    /// Write the last published frame here as a viewer JSON file.
    pub export: Option<PathBuf>,
    pub export_max_width: Option<u32>,
    pub on_telemetry: Option<TelemetryCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl RunOptions {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            frames: None,
            mode: PreviewMode::default(),
            layout: SyntheticLayout::default(),
            gpu: false,
            export: None,
            export_max_width: None,
            on_telemetry: None,
            on_error: None,
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub telemetry: TelemetrySnapshot,
    pub report: TelemetryReport,
    pub render: RenderStatus,
    pub exported: Option<PathBuf>,
}

/// Run the pipeline until the source is exhausted or fails, then shut the
/// render thread down and export the last frame if asked to.
///
/// A render setup failure does not fail the run: the renderer reports
/// itself degraded and capture and processing carry on.
pub fn run(options: RunOptions) -> Result<RunSummary, RunError> {
    let settings = options.settings;
    settings.validate()?;
    if !settings.sizes_match() {
        warn!(
            capture = %settings.capture_dimensions(),
            texture = %settings.texture_dimensions(),
            "capture and texture sizes differ, every processed frame will be rejected at upload"
        );
    }

    if !runtime::initialise(|| CannyEdgeDetector::check(&settings.edge)) {
        warn!("edge detector unavailable, processed frames will be skipped");
    }

    let slot = Arc::new(FrameSlot::new());
    let extent = settings.texture_dimensions();
    let mut render = if options.gpu {
        RenderThread::spawn(GpuTarget::headless, Arc::clone(&slot), extent)?
    } else {
        RenderThread::spawn(|| Ok(CpuTarget::new()), Arc::clone(&slot), extent)?
    };
    if let Some(reason) = render.status().setup_error {
        warn!("rendering degraded: {reason}");
    }

    let source = SyntheticSource::new(SyntheticConfig {
        width: settings.capture_width,
        height: settings.capture_height,
        layout: options.layout,
        row_padding: 0,
        fps: settings.target_fps,
        frame_limit: options.frames,
    })?;

    let tap = export_tap(options.export.is_some());
    let stats = Arc::new(Mutex::new(PipelineStats::new(Duration::from_millis(
        settings.telemetry_window_ms,
    ))));
    let mut worker = FrameWorker::new(
        Box::new(CannyEdgeDetector::new(&settings.edge)),
        Arc::clone(&slot),
        Arc::new(render.handle()),
        stats,
    )
    .with_mode(Arc::new(ModeSwitch::new(options.mode)));
    if let Some(tap) = &tap {
        worker = worker.with_frame_tap(Arc::clone(tap));
    }
    if let Some(callback) = options.on_telemetry {
        worker = worker.with_telemetry_callback(callback);
    }

    info!(
        capture = %settings.capture_dimensions(),
        texture = %extent,
        mode = %options.mode,
        gpu = options.gpu,
        "starting pipeline"
    );
    let mut session = PipelineSession::start(Box::new(source), worker, options.on_error)?;
    session.wait();
    let telemetry = session.telemetry();
    let report = session.report();

    render.shutdown();
    let render_status = render.status();

    let exported = match (options.export, tap) {
        (Some(path), Some(tap)) => {
            let frame = tap.lock().take().ok_or(RunError::NothingToExport)?;
            ViewerFrame::encode(&frame, report, options.export_max_width)?.write_json(&path)?;
            Some(path)
        }
        _ => None,
    };

    info!(
        frames = telemetry.frames_processed,
        skipped = telemetry.frames_skipped,
        rejected = telemetry.frames_rejected,
        uploads = render_status.stats.uploads,
        "pipeline finished"
    );

    Ok(RunSummary {
        telemetry,
        report,
        render: render_status,
        exported,
    })
}

/// The last-frame copy the worker keeps for an export, only when one was
/// asked for.
fn export_tap(exporting: bool) -> Option<FrameTap> {
    exporting.then(|| Arc::new(Mutex::new(None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_tap_only_when_exporting() {
        assert!(export_tap(false).is_none());
        let tap = export_tap(true).unwrap();
        assert!(tap.lock().is_none());
    }
}
