// Canny edge detection on the luma plane of a canonical frame.
//
// Stages: 5-tap separable Gaussian (clamped borders), 3x3 Sobel, L1 gradient
// magnitude, non-maximum suppression quantised to four directions, then
// double-threshold hysteresis. Output is opaque RGBA: edges white, the rest
// black.

use tracing::trace;

use crate::pipeline::frame::{CanonicalFrame, ProcessedFrame};
use crate::pipeline::processor::{FrameProcessor, NoOutput, ProcessOutcome};
use crate::settings::EdgeSettings;

/// tan(22.5°) and tan(67.5°), the direction bin boundaries.
const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

/// Build a normalised 5-tap Gaussian kernel.
pub fn gaussian_kernel(sigma: f32) -> [f32; 5] {
    let sigma = if sigma > 0.0 { sigma } else { 1.0 };
    let denom = 2.0 * sigma * sigma;
    let mut kernel = [0.0f32; 5];
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - 2.0;
        *k = (-(x * x) / denom).exp();
    }
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Reference edge detector implementing [`FrameProcessor`].
pub struct CannyEdgeDetector {
    kernel: [f32; 5],
    low: f32,
    high: f32,
    blur_tmp: Vec<f32>,
    blurred: Vec<f32>,
    magnitude: Vec<f32>,
    edges: Vec<u8>,
}

impl CannyEdgeDetector {
    pub fn new(settings: &EdgeSettings) -> Self {
        let (low, high) = if settings.low_threshold <= settings.high_threshold {
            (settings.low_threshold, settings.high_threshold)
        } else {
            (settings.high_threshold, settings.low_threshold)
        };
        Self {
            kernel: gaussian_kernel(settings.blur_sigma),
            low,
            high,
            blur_tmp: Vec::new(),
            blurred: Vec::new(),
            magnitude: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Whether `settings` describe a detector that can run: a finite positive
    /// blur and finite non-negative thresholds.
    pub fn check(settings: &EdgeSettings) -> Result<(), String> {
        if !settings.blur_sigma.is_finite() || settings.blur_sigma <= 0.0 {
            return Err(format!("blur sigma {} is not usable", settings.blur_sigma));
        }
        for threshold in [settings.low_threshold, settings.high_threshold] {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(format!("threshold {threshold} is not usable"));
            }
        }
        Ok(())
    }

    fn blur(&mut self, gray: &[u8], w: usize, h: usize) {
        self.blur_tmp.clear();
        self.blur_tmp.resize(w * h, 0.0);
        self.blurred.clear();
        self.blurred.resize(w * h, 0.0);

        // Horizontal pass.
        for y in 0..h {
            let row = &gray[y * w..(y + 1) * w];
            for x in 0..w {
                let mut acc = 0.0f32;
                for (ki, &kv) in self.kernel.iter().enumerate() {
                    let sx = (x as isize + ki as isize - 2).clamp(0, w as isize - 1) as usize;
                    acc += row[sx] as f32 * kv;
                }
                self.blur_tmp[y * w + x] = acc;
            }
        }

        // Vertical pass.
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0f32;
                for (ki, &kv) in self.kernel.iter().enumerate() {
                    let sy = (y as isize + ki as isize - 2).clamp(0, h as isize - 1) as usize;
                    acc += self.blur_tmp[sy * w + x] * kv;
                }
                self.blurred[y * w + x] = acc;
            }
        }
    }

    /// Sobel gradients, magnitude and suppression in one sweep. Border pixels
    /// are never edges. Writes 0 (none), 1 (weak) or 2 (strong) into `edges`.
    fn suppress(&mut self, w: usize, h: usize) {
        let src = &self.blurred;
        let at = |x: usize, y: usize| src[y * w + x];

        self.magnitude.clear();
        self.magnitude.resize(w * h, 0.0);
        let mut gradients = vec![(0.0f32, 0.0f32); w * h];

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
                let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
                self.magnitude[y * w + x] = gx.abs() + gy.abs();
                gradients[y * w + x] = (gx, gy);
            }
        }

        self.edges.clear();
        self.edges.resize(w * h, 0);
        let mag = &self.magnitude;
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let i = y * w + x;
                let m = mag[i];
                if m <= self.low {
                    continue;
                }
                let (gx, gy) = gradients[i];
                let (ax, ay) = (gx.abs(), gy.abs());
                // (before, after) along the gradient direction.
                let (before, after) = if ay <= TAN_22_5 * ax {
                    (mag[i - 1], mag[i + 1])
                } else if ay >= TAN_67_5 * ax {
                    (mag[i - w], mag[i + w])
                } else if (gx > 0.0) == (gy > 0.0) {
                    (mag[i - w - 1], mag[i + w + 1])
                } else {
                    (mag[i - w + 1], mag[i + w - 1])
                };
                if m > before && m >= after {
                    self.edges[i] = if m > self.high { 2 } else { 1 };
                }
            }
        }
    }

    /// Promote weak pixels 8-connected to a strong one; drop the rest.
    fn hysteresis(&mut self, w: usize, h: usize) {
        let mut stack: Vec<usize> = (0..w * h).filter(|&i| self.edges[i] == 2).collect();
        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if self.edges[n] == 1 {
                        self.edges[n] = 2;
                        stack.push(n);
                    }
                }
            }
        }
    }
}

impl FrameProcessor for CannyEdgeDetector {
    fn name(&self) -> &'static str {
        "canny"
    }

    fn process(&mut self, frame: &CanonicalFrame) -> ProcessOutcome {
        let w = frame.width() as usize;
        let h = frame.height() as usize;
        if w < 3 || h < 3 {
            return ProcessOutcome::NoOutput(NoOutput::Unsupported(format!(
                "{} is too small for edge detection",
                frame.dimensions()
            )));
        }

        self.blur(frame.luma(), w, h);
        self.suppress(w, h);
        self.hysteresis(w, h);

        let mut rgba = Vec::with_capacity(w * h * 4);
        let mut edge_count = 0usize;
        for &e in &self.edges {
            let v = if e == 2 {
                edge_count += 1;
                255
            } else {
                0
            };
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
        trace!(edge_count, "canny pass complete");

        ProcessOutcome::Frame(ProcessedFrame::new(rgba, frame.width(), frame.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame::Dimensions;

    fn frame_from_luma(w: u32, h: u32, luma: impl Fn(u32, u32) -> u8) -> CanonicalFrame {
        let dims = Dimensions::new(w, h);
        let mut data = Vec::with_capacity(dims.canonical_len());
        for y in 0..h {
            for x in 0..w {
                data.push(luma(x, y));
            }
        }
        data.resize(dims.canonical_len(), 128);
        CanonicalFrame::from_bytes(data, dims).unwrap()
    }

    fn white_at(frame: &ProcessedFrame, x: u32, y: u32) -> bool {
        let i = ((y * frame.width + x) * 4) as usize;
        frame.data[i] == 255
    }

    fn detector() -> CannyEdgeDetector {
        CannyEdgeDetector::new(&EdgeSettings::default())
    }

    #[test]
    fn check_rejects_unusable_settings() {
        assert!(CannyEdgeDetector::check(&EdgeSettings::default()).is_ok());
        let bad_sigma = EdgeSettings {
            blur_sigma: f32::NAN,
            ..EdgeSettings::default()
        };
        assert!(CannyEdgeDetector::check(&bad_sigma).is_err());
        let negative = EdgeSettings {
            low_threshold: -1.0,
            ..EdgeSettings::default()
        };
        assert!(CannyEdgeDetector::check(&negative).is_err());
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(1.5);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((k[0] - k[4]).abs() < 1e-6);
        assert!((k[1] - k[3]).abs() < 1e-6);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn flat_frame_has_no_edges() {
        let frame = frame_from_luma(16, 16, |_, _| 90);
        let out = detector().process(&frame).frame().unwrap();
        assert!(out.has_rgba_len());
        assert!(out.data.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn vertical_step_yields_single_edge_column() {
        let frame = frame_from_luma(16, 16, |x, _| if x < 8 { 0 } else { 255 });
        let out = detector().process(&frame).frame().unwrap();

        for y in 1..15 {
            // The step sits between columns 7 and 8; exactly one survives
            // suppression.
            assert!(
                white_at(&out, 7, y) != white_at(&out, 8, y),
                "expected one edge pixel at row {y}"
            );
            for x in (0..16).filter(|&x| x != 7 && x != 8) {
                assert!(!white_at(&out, x, y), "unexpected edge at ({x},{y})");
            }
        }
        // Border rows are never edges.
        for x in 0..16 {
            assert!(!white_at(&out, x, 0));
            assert!(!white_at(&out, x, 15));
        }
    }

    #[test]
    fn weak_isolated_edges_are_discarded() {
        let frame = frame_from_luma(16, 16, |x, _| if x < 8 { 0 } else { 40 });
        let out = detector().process(&frame).frame().unwrap();
        assert!(out.data.chunks(4).all(|px| px[0] == 0));
    }

    #[test]
    fn output_is_opaque() {
        let frame = frame_from_luma(8, 8, |x, y| ((x * 31 + y * 17) % 256) as u8);
        let out = detector().process(&frame).frame().unwrap();
        assert!(out.data.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn tiny_frames_are_unsupported() {
        let frame = frame_from_luma(2, 2, |_, _| 0);
        assert!(matches!(
            detector().process(&frame),
            ProcessOutcome::NoOutput(NoOutput::Unsupported(_))
        ));
    }

    #[test]
    fn swapped_thresholds_are_reordered() {
        let settings = EdgeSettings {
            low_threshold: 150.0,
            high_threshold: 50.0,
            ..EdgeSettings::default()
        };
        let d = CannyEdgeDetector::new(&settings);
        assert_eq!((d.low, d.high), (50.0, 150.0));
    }
}
