// Web viewer export: processed frames as PNG data URIs with viewer stats.

pub mod compress;

use std::path::Path;

use base64::Engine;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::diagnostics::stats::TelemetryReport;
use crate::pipeline::frame::ProcessedFrame;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("buffer of {len} bytes does not hold a {width}x{height} RGBA image")]
    InvalidBuffer { width: u32, height: u32, len: usize },

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("resize failed: {0}")]
    Resize(String),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialise export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stats shown next to the image in the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerStats {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub processing_ms: f64,
}

/// One frame for the web viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerFrame {
    /// `data:image/png;base64,...`
    pub image: String,
    pub stats: ViewerStats,
}

impl ViewerFrame {
    /// Encode `frame`, downscaled to at most `max_width` pixels wide when
    /// given. Stats report the original frame size.
    pub fn encode(
        frame: &ProcessedFrame,
        report: TelemetryReport,
        max_width: Option<u32>,
    ) -> Result<Self, ExportError> {
        if !frame.has_rgba_len() {
            return Err(ExportError::InvalidBuffer {
                width: frame.width,
                height: frame.height,
                len: frame.data.len(),
            });
        }

        let png = match max_width {
            Some(max) if max < frame.width => {
                let (w, h) = compress::fit_width(frame.width, frame.height, max);
                compress::encode_thumbnail(&frame.data, frame.width, frame.height, w, h)?
            }
            _ => compress::encode_png(&frame.data, frame.width, frame.height)?,
        };

        Ok(Self {
            image: format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(&png)
            ),
            stats: ViewerStats {
                fps: report.fps,
                width: frame.width,
                height: frame.height,
                processing_ms: report.processing_ms,
            },
        })
    }

    /// Write as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "viewer frame exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> TelemetryReport {
        TelemetryReport {
            fps: 30.0,
            processing_ms: 12.5,
        }
    }

    fn frame(width: u32, height: u32) -> ProcessedFrame {
        ProcessedFrame::new(vec![200; (width * height * 4) as usize], width, height)
    }

    fn decode_png(uri: &str) -> image::DynamicImage {
        let b64 = uri.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn encodes_png_data_uri_with_stats() {
        let viewer = ViewerFrame::encode(&frame(8, 6), report(), None).unwrap();
        let img = decode_png(&viewer.image);
        assert_eq!((img.width(), img.height()), (8, 6));
        assert_eq!(viewer.stats.width, 8);
        assert_eq!(viewer.stats.processing_ms, 12.5);
    }

    #[test]
    fn downscales_wide_frames() {
        let viewer = ViewerFrame::encode(&frame(64, 32), report(), Some(16)).unwrap();
        let img = decode_png(&viewer.image);
        assert_eq!((img.width(), img.height()), (16, 8));
        // Stats keep the source size.
        assert_eq!((viewer.stats.width, viewer.stats.height), (64, 32));
    }

    #[test]
    fn rejects_wrong_length() {
        let bad = ProcessedFrame::new(vec![0; 5], 2, 2);
        assert!(matches!(
            ViewerFrame::encode(&bad, report(), None),
            Err(ExportError::InvalidBuffer { .. })
        ));
    }

    #[test]
    fn serialises_camel_case() {
        let viewer = ViewerFrame::encode(&frame(2, 2), report(), None).unwrap();
        let json = serde_json::to_value(&viewer).unwrap();
        assert_eq!(json["stats"]["processingMs"], 12.5);
        assert_eq!(json["stats"]["fps"], 30.0);
        assert!(json["image"].as_str().unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn write_json_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("frame.json");
        let viewer = ViewerFrame::encode(&frame(2, 2), report(), None).unwrap();
        viewer.write_json(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"processingMs\""));
    }
}
