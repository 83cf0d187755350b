use serde::{Deserialize, Serialize};

use crate::pipeline::frame::Dimensions;
use crate::settings::error::{Result, SettingsError};

/// Slowest pacing accepted; zero means unpaced.
pub const MIN_TARGET_FPS: f32 = 0.01;

/// Edge detector parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeSettings {
    pub blur_sigma: f32,
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            blur_sigma: 1.5,
            low_threshold: 50.0,
            high_threshold: 150.0,
        }
    }
}

/// Top-level settings file structure.
///
/// Missing fields fall back to their defaults, so a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    pub capture_width: u32,
    pub capture_height: u32,
    pub texture_width: u32,
    pub texture_height: u32,
    pub telemetry_window_ms: u64,
    pub target_fps: f32,
    pub edge: EdgeSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            capture_width: 640,
            capture_height: 480,
            texture_width: 640,
            texture_height: 480,
            telemetry_window_ms: 1000,
            target_fps: 30.0,
            edge: EdgeSettings::default(),
        }
    }
}

impl PipelineSettings {
    pub fn capture_dimensions(&self) -> Dimensions {
        Dimensions::new(self.capture_width, self.capture_height)
    }

    pub fn texture_dimensions(&self) -> Dimensions {
        Dimensions::new(self.texture_width, self.texture_height)
    }

    /// Whether processed frames fit the texture. Frames of any other size are
    /// rejected at upload.
    pub fn sizes_match(&self) -> bool {
        self.capture_dimensions() == self.texture_dimensions()
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let capture = self.capture_dimensions();
        if !capture.is_even_nonzero() {
            return Err(SettingsError::Invalid(format!(
                "capture size {capture} must be even and non-zero"
            )));
        }
        let texture = self.texture_dimensions();
        if texture.width == 0 || texture.height == 0 {
            return Err(SettingsError::Invalid(format!(
                "texture size {texture} must be non-zero"
            )));
        }
        if self.telemetry_window_ms == 0 {
            return Err(SettingsError::Invalid(
                "telemetry window must be non-zero".to_string(),
            ));
        }
        if !self.target_fps.is_finite()
            || self.target_fps < 0.0
            || (self.target_fps > 0.0 && self.target_fps < MIN_TARGET_FPS)
        {
            return Err(SettingsError::Invalid(format!(
                "target fps {} must be 0 or at least {MIN_TARGET_FPS}",
                self.target_fps
            )));
        }
        let edge = &self.edge;
        if edge.blur_sigma.is_nan() || edge.blur_sigma <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "blur sigma {} must be positive",
                edge.blur_sigma
            )));
        }
        if edge.low_threshold < 0.0 || edge.low_threshold > edge.high_threshold {
            return Err(SettingsError::Invalid(format!(
                "thresholds must satisfy 0 <= low <= high, got {} / {}",
                edge.low_threshold, edge.high_threshold
            )));
        }
        Ok(())
    }
}
