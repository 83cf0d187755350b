pub mod stats;

pub use stats::{FpsWindow, PipelineStats, TelemetryReport, TelemetrySnapshot};
