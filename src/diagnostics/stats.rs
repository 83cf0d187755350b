use serde::Serialize;
use std::time::{Duration, Instant};

/// Rolling frames-per-second counter.
///
/// Frames are counted until at least one window has elapsed since the window
/// start; the rate is then `count / elapsed` and the counter restarts.
#[derive(Debug, Clone)]
pub struct FpsWindow {
    window: Duration,
    count: u32,
    window_start: Instant,
    fps: f64,
}

impl FpsWindow {
    pub fn new(window: Duration, start: Instant) -> Self {
        Self {
            window,
            count: 0,
            window_start: start,
            fps: 0.0,
        }
    }

    /// Count one frame at `now`. Returns the new rate when the window rolls
    /// over.
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.count += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        self.fps = f64::from(self.count) / elapsed.as_secs_f64();
        self.count = 0;
        self.window_start = now;
        Some(self.fps)
    }

    /// Most recently computed rate; zero before the first window closes.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Frames counted in the current, still open window.
    pub fn pending(&self) -> u32 {
        self.count
    }
}

/// One telemetry line: rate and latest processing latency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReport {
    pub fps: f64,
    pub processing_ms: f64,
}

impl std::fmt::Display for TelemetryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FPS: {:.1} | Proc: {:.1} ms", self.fps, self.processing_ms)
    }
}

/// Collects statistics for a pipeline session.
pub struct PipelineStats {
    fps: FpsWindow,
    last_processing: Duration,
    frames_processed: u64,
    frames_skipped: u64,
    frames_rejected: u64,
}

/// Snapshot of pipeline stats for serialisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub fps: f64,
    pub processing_ms: f64,
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_rejected: u64,
}

impl PipelineStats {
    /// Create new stats with zeroed counters.
    pub fn new(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    /// Create new stats whose first window opens at `start`.
    pub fn starting_at(window: Duration, start: Instant) -> Self {
        Self {
            fps: FpsWindow::new(window, start),
            last_processing: Duration::ZERO,
            frames_processed: 0,
            frames_skipped: 0,
            frames_rejected: 0,
        }
    }

    /// Record a successfully processed frame. Returns a report when the FPS
    /// window rolls over.
    pub fn record_frame(&mut self, processing: Duration, now: Instant) -> Option<TelemetryReport> {
        self.frames_processed += 1;
        self.last_processing = processing;
        self.fps.record(now).map(|_| self.report())
    }

    /// Record a frame the processor produced nothing for.
    pub fn record_skip(&mut self) {
        self.frames_skipped += 1;
    }

    /// Record a frame the converter rejected.
    pub fn record_reject(&mut self) {
        self.frames_rejected += 1;
    }

    /// Latest processing latency in milliseconds.
    pub fn processing_ms(&self) -> f64 {
        self.last_processing.as_secs_f64() * 1000.0
    }

    pub fn report(&self) -> TelemetryReport {
        TelemetryReport {
            fps: self.fps.fps(),
            processing_ms: self.processing_ms(),
        }
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            fps: self.fps.fps(),
            processing_ms: self.processing_ms(),
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            frames_rejected: self.frames_rejected,
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn thirty_frames_over_one_second_is_thirty_fps() {
        let t0 = Instant::now();
        let mut window = FpsWindow::new(SECOND, t0);
        let mut reported = None;
        for i in 1..=30 {
            let now = t0 + Duration::from_secs_f64(f64::from(i) / 30.0);
            if let Some(fps) = window.record(now) {
                reported = Some(fps);
            }
        }
        let fps = reported.expect("window should roll over at 1.0 s");
        assert!((fps - 30.0).abs() < 1e-9, "got {fps}");
        assert_eq!(window.pending(), 0);
    }

    #[test]
    fn no_report_before_window_elapses() {
        let t0 = Instant::now();
        let mut window = FpsWindow::new(SECOND, t0);
        for i in 1..=10 {
            assert!(window.record(t0 + Duration::from_millis(i * 50)).is_none());
        }
        assert_eq!(window.fps(), 0.0);
        assert_eq!(window.pending(), 10);
    }

    #[test]
    fn window_restarts_after_rollover() {
        let t0 = Instant::now();
        let mut window = FpsWindow::new(SECOND, t0);
        assert!(window.record(t0 + Duration::from_millis(1000)).is_some());
        // Next window opens at 1.0 s; two frames in 2.0 s gives 1 fps.
        assert!(window.record(t0 + Duration::from_millis(1500)).is_none());
        let fps = window.record(t0 + Duration::from_millis(3000)).unwrap();
        assert!((fps - 1.0).abs() < 1e-9);
    }

    #[test]
    fn report_formats_one_decimal() {
        let report = TelemetryReport {
            fps: 29.96,
            processing_ms: 12.34,
        };
        assert_eq!(report.to_string(), "FPS: 30.0 | Proc: 12.3 ms");
    }

    #[test]
    fn record_frame_tracks_latest_latency() {
        let t0 = Instant::now();
        let mut stats = PipelineStats::starting_at(SECOND, t0);
        stats.record_frame(Duration::from_millis(8), t0 + Duration::from_millis(10));
        stats.record_frame(Duration::from_millis(12), t0 + Duration::from_millis(20));
        assert!((stats.processing_ms() - 12.0).abs() < 1e-9);
        assert_eq!(stats.snapshot().frames_processed, 2);
    }

    #[test]
    fn record_frame_reports_on_rollover() {
        let t0 = Instant::now();
        let mut stats = PipelineStats::starting_at(SECOND, t0);
        let report = stats
            .record_frame(Duration::from_millis(5), t0 + SECOND)
            .unwrap();
        assert_eq!(report.to_string(), "FPS: 1.0 | Proc: 5.0 ms");
    }

    #[test]
    fn skips_and_rejects_are_counted() {
        let mut stats = PipelineStats::default();
        stats.record_skip();
        stats.record_skip();
        stats.record_reject();
        let snap = stats.snapshot();
        assert_eq!(snap.frames_skipped, 2);
        assert_eq!(snap.frames_rejected, 1);
        assert_eq!(snap.frames_processed, 0);
    }

    #[test]
    fn snapshot_serialises_to_camelcase() {
        let stats = PipelineStats::default();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert!(json["processingMs"].is_number());
        assert!(json["framesSkipped"].is_number());
        assert!(json["framesRejected"].is_number());
    }
}
