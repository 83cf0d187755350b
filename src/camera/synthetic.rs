use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::backend::CaptureSource;
use crate::camera::error::{CaptureError, Result};
use crate::camera::types::{Plane, RawFrame};

/// Memory layout the synthetic source hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyntheticLayout {
    /// Three tightly sampled planes (I420), chroma pixel stride 1.
    #[default]
    Planar,
    /// Three planes where U and V alias one interleaved VU buffer with
    /// pixel stride 2, the way Android exposes NV21-backed YUV_420_888.
    Interleaved,
}

/// Configuration for [`SyntheticSource`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub layout: SyntheticLayout,
    /// Extra bytes appended to every row of every plane.
    pub row_padding: usize,
    /// Frame pacing. Zero disables pacing.
    pub fps: f32,
    /// Stop after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            layout: SyntheticLayout::Planar,
            row_padding: 0,
            fps: 30.0,
            frame_limit: None,
        }
    }
}

/// A camera stand-in that renders a moving bar pattern into YUV 4:2:0
/// buffers. Used by the binary and by tests; no hardware required.
pub struct SyntheticSource {
    config: SyntheticConfig,
    y: Vec<u8>,
    y_stride: usize,
    chroma: Vec<u8>,
    chroma_stride: usize,
    frame_index: u64,
    started: Instant,
    next_deadline: Option<Instant>,
    closed: bool,
}

impl SyntheticSource {
    /// Create a source. Dimensions must be even and non-zero.
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0
            || config.height == 0
            || config.width % 2 != 0
            || config.height % 2 != 0
        {
            return Err(CaptureError::Source(format!(
                "unsupported synthetic dimensions {}x{}",
                config.width, config.height
            )));
        }

        let width = config.width as usize;
        let height = config.height as usize;
        let y_stride = width + config.row_padding;
        let (chroma_stride, chroma_len) = match config.layout {
            // U rows then V rows in one buffer.
            SyntheticLayout::Planar => {
                let stride = width / 2 + config.row_padding;
                (stride, stride * height)
            }
            SyntheticLayout::Interleaved => {
                let stride = width + config.row_padding;
                (stride, stride * height / 2)
            }
        };

        Ok(Self {
            y: vec![0; y_stride * height],
            y_stride,
            chroma: vec![0; chroma_len],
            chroma_stride,
            frame_index: 0,
            started: Instant::now(),
            next_deadline: None,
            closed: false,
            config,
        })
    }

    /// Number of frames produced so far.
    pub fn frames_produced(&self) -> u64 {
        self.frame_index
    }

    fn pace(&mut self) {
        if self.config.fps <= 0.0 {
            return;
        }
        // Rates too slow to express as a Duration run unpaced.
        let Ok(interval) = Duration::try_from_secs_f32(1.0 / self.config.fps) else {
            return;
        };
        let now = Instant::now();
        let deadline = self.next_deadline.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next_deadline = Some(deadline.max(now) + interval);
    }

    /// Draw the pattern for the current frame index.
    fn render_pattern(&mut self) {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let bar_width = (width / 8).max(2);
        let bar_x = (self.frame_index as usize * 4) % width;

        for row in 0..height {
            let line = &mut self.y[row * self.y_stride..row * self.y_stride + width];
            for (col, px) in line.iter_mut().enumerate() {
                let in_bar = col >= bar_x && col < bar_x + bar_width;
                *px = if in_bar {
                    235
                } else {
                    (16 + (row * 96 / height.max(1))) as u8
                };
            }
        }

        let chroma_w = width / 2;
        let chroma_h = height / 2;
        let tint = (self.frame_index % 64) as u8;
        match self.config.layout {
            SyntheticLayout::Planar => {
                let v_offset = self.chroma_stride * chroma_h;
                for row in 0..chroma_h {
                    for col in 0..chroma_w {
                        let u = 96u8.wrapping_add(tint).wrapping_add(col as u8 / 4);
                        let v = 160u8.wrapping_sub(tint).wrapping_add(row as u8 / 4);
                        self.chroma[row * self.chroma_stride + col] = u;
                        self.chroma[v_offset + row * self.chroma_stride + col] = v;
                    }
                }
            }
            SyntheticLayout::Interleaved => {
                for row in 0..chroma_h {
                    for col in 0..chroma_w {
                        let u = 96u8.wrapping_add(tint).wrapping_add(col as u8 / 4);
                        let v = 160u8.wrapping_sub(tint).wrapping_add(row as u8 / 4);
                        let base = row * self.chroma_stride + col * 2;
                        self.chroma[base] = v;
                        self.chroma[base + 1] = u;
                    }
                }
            }
        }
    }
}

impl CaptureSource for SyntheticSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn next_frame(&mut self, sink: &mut dyn FnMut(&RawFrame<'_>)) -> Result<bool> {
        if self.closed {
            return Err(CaptureError::Closed);
        }
        if let Some(limit) = self.config.frame_limit {
            if self.frame_index >= limit {
                return Ok(false);
            }
        }

        self.pace();
        self.render_pattern();

        let timestamp_us = self.started.elapsed().as_micros() as u64;
        let y = Plane::new(&self.y, self.y_stride, 1);
        let planes = match self.config.layout {
            SyntheticLayout::Planar => {
                let split = self.chroma.len() / 2;
                let (u, v) = self.chroma.split_at(split);
                [
                    y,
                    Plane::new(u, self.chroma_stride, 1),
                    Plane::new(v, self.chroma_stride, 1),
                ]
            }
            SyntheticLayout::Interleaved => [
                y,
                Plane::new(&self.chroma[1..], self.chroma_stride, 2),
                Plane::new(&self.chroma, self.chroma_stride, 2),
            ],
        };

        let frame = RawFrame::planar(self.config.width, self.config.height, &planes)
            .with_timestamp(timestamp_us);
        sink(&frame);

        self.frame_index += 1;
        Ok(true)
    }

    fn close(&mut self) {
        if !self.closed {
            debug!(frames = self.frame_index, "synthetic source closed");
        }
        self.closed = true;
    }
}
