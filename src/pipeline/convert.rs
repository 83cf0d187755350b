// Pixel-format conversion between the camera's multi-plane YUV 4:2:0 layout
// and the pipeline's canonical NV21 buffer.
//
// The conversion is a pure memory-layout transform: no normalisation, no
// colour-space change. Only `nv21_to_rgba` (used by the raw preview mode)
// decodes colour.

use crate::camera::types::{ChromaOrder, Plane, RawFrame};
use crate::pipeline::error::{ConvertError, Result};
use crate::pipeline::frame::{CanonicalFrame, Dimensions};

/// Convert a three-plane `[Y, U, V]` or two-plane `[Y, chroma]` capture into a
/// contiguous NV21 buffer.
///
/// Each plane is read through its own row and pixel strides. Chroma bytes are
/// written V first, U second; downstream decoders depend on that order.
pub fn yuv420_to_nv21(raw: &RawFrame<'_>) -> Result<CanonicalFrame> {
    let dims = Dimensions::new(raw.width, raw.height);
    if !dims.is_even_nonzero() {
        return Err(ConvertError::InvalidDimensions {
            width: raw.width,
            height: raw.height,
        });
    }

    let width = raw.width as usize;
    let height = raw.height as usize;
    let chroma_w = width / 2;
    let chroma_h = height / 2;

    let mut out = vec![0u8; dims.canonical_len()];
    let (luma_out, chroma_out) = out.split_at_mut(width * height);

    match raw.planes {
        [y, u, v] => {
            check_plane("luma", y, height, width, 1)?;
            check_plane("U", u, chroma_h, chroma_w, 1)?;
            check_plane("V", v, chroma_h, chroma_w, 1)?;
            copy_luma(y, luma_out, width, height);
            interleave_vu(u, v, chroma_out, chroma_w, chroma_h);
        }
        [y, chroma] => {
            check_plane("luma", y, height, width, 1)?;
            // Each sample is a two-byte pair, so the pair must fit in the stride.
            if chroma.pixel_stride < 2 {
                return Err(ConvertError::InvalidStride {
                    plane: "chroma",
                    row_stride: chroma.row_stride,
                    pixel_stride: chroma.pixel_stride,
                });
            }
            check_plane("chroma", chroma, chroma_h, chroma_w, 2)?;
            copy_luma(y, luma_out, width, height);
            reorder_semi_planar(chroma, raw.chroma_order, chroma_out, chroma_w, chroma_h);
        }
        other => return Err(ConvertError::PlaneCount(other.len())),
    }

    Ok(CanonicalFrame::from_parts_unchecked(out, dims))
}

/// Validate strides and length for a plane addressed as `rows` x `cols`
/// samples of `sample_bytes` each.
fn check_plane(
    name: &'static str,
    plane: &Plane<'_>,
    rows: usize,
    cols: usize,
    sample_bytes: usize,
) -> Result<()> {
    let invalid_stride = || ConvertError::InvalidStride {
        plane: name,
        row_stride: plane.row_stride,
        pixel_stride: plane.pixel_stride,
    };
    if plane.pixel_stride == 0 {
        return Err(invalid_stride());
    }
    let row_span = (cols - 1)
        .checked_mul(plane.pixel_stride)
        .and_then(|span| span.checked_add(sample_bytes))
        .ok_or_else(invalid_stride)?;
    if rows > 1 && plane.row_stride < row_span {
        return Err(invalid_stride());
    }

    let required = plane
        .required_len(rows, cols)
        .and_then(|len| len.checked_add(sample_bytes - 1))
        .ok_or_else(invalid_stride)?;
    if plane.data.len() < required {
        return Err(ConvertError::PlaneTooShort {
            plane: name,
            required,
            actual: plane.data.len(),
        });
    }
    Ok(())
}

fn copy_luma(y: &Plane<'_>, out: &mut [u8], width: usize, height: usize) {
    for (row, line) in out.chunks_exact_mut(width).take(height).enumerate() {
        let start = row * y.row_stride;
        if y.pixel_stride == 1 {
            line.copy_from_slice(&y.data[start..start + width]);
        } else {
            for (col, px) in line.iter_mut().enumerate() {
                *px = y.data[start + col * y.pixel_stride];
            }
        }
    }
}

fn interleave_vu(u: &Plane<'_>, v: &Plane<'_>, out: &mut [u8], chroma_w: usize, chroma_h: usize) {
    for (row, line) in out.chunks_exact_mut(chroma_w * 2).take(chroma_h).enumerate() {
        let u_row = row * u.row_stride;
        let v_row = row * v.row_stride;
        for (col, pair) in line.chunks_exact_mut(2).enumerate() {
            pair[0] = v.data[v_row + col * v.pixel_stride];
            pair[1] = u.data[u_row + col * u.pixel_stride];
        }
    }
}

fn reorder_semi_planar(
    chroma: &Plane<'_>,
    order: ChromaOrder,
    out: &mut [u8],
    chroma_w: usize,
    chroma_h: usize,
) {
    let (v_offset, u_offset) = match order {
        ChromaOrder::Uv => (1, 0),
        ChromaOrder::Vu => (0, 1),
    };
    for (row, line) in out.chunks_exact_mut(chroma_w * 2).take(chroma_h).enumerate() {
        let row_start = row * chroma.row_stride;
        for (col, pair) in line.chunks_exact_mut(2).enumerate() {
            let idx = row_start + col * chroma.pixel_stride;
            pair[0] = chroma.data[idx + v_offset];
            pair[1] = chroma.data[idx + u_offset];
        }
    }
}

/// Decode an NV21 frame to RGBA with BT.601 integer coefficients.
pub fn nv21_to_rgba(frame: &CanonicalFrame) -> Vec<u8> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let y_plane = frame.luma();
    let vu_plane = frame.chroma();

    let mut rgba = vec![0u8; width * height * 4];

    for row in 0..height {
        for col in 0..width {
            let y = y_plane[row * width + col] as i32;
            let vu_index = (row / 2) * width + (col / 2) * 2;
            let v = vu_plane[vu_index] as i32 - 128;
            let u = vu_plane[vu_index + 1] as i32 - 128;

            let base = (row * width + col) * 4;
            rgba[base] = ((y * 256 + 359 * v) >> 8).clamp(0, 255) as u8;
            rgba[base + 1] = ((y * 256 - 88 * u - 183 * v) >> 8).clamp(0, 255) as u8;
            rgba[base + 2] = ((y * 256 + 454 * u) >> 8).clamp(0, 255) as u8;
            rgba[base + 3] = 255;
        }
    }

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a tight three-plane frame's buffers: luma `0..w*h`, U and V
    /// filled from the given starting values.
    fn tight_planes(width: usize, height: usize, u_start: u8, v_start: u8) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let y: Vec<u8> = (0..width * height).map(|i| i as u8).collect();
        let chroma = width / 2 * height / 2;
        let u: Vec<u8> = (0..chroma).map(|i| u_start.wrapping_add(i as u8)).collect();
        let v: Vec<u8> = (0..chroma).map(|i| v_start.wrapping_add(i as u8)).collect();
        (y, u, v)
    }

    #[test]
    fn four_by_four_frame_has_expected_layout() {
        let (y, u, v) = tight_planes(4, 4, 100, 200);
        let planes = [
            Plane::new(&y, 4, 1),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 2, 1),
        ];
        let frame = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap();

        assert_eq!(frame.as_bytes().len(), 24);
        assert_eq!(frame.luma(), y.as_slice());
        assert_eq!(frame.chroma(), &[200, 100, 201, 101, 202, 102, 203, 103]);
    }

    #[test]
    fn output_length_is_three_halves_for_even_sizes() {
        for (w, h) in [(2usize, 2usize), (6, 4), (16, 10), (640, 480)] {
            let (y, u, v) = tight_planes(w, h, 0, 0);
            let planes = [
                Plane::new(&y, w, 1),
                Plane::new(&u, w / 2, 1),
                Plane::new(&v, w / 2, 1),
            ];
            let frame = yuv420_to_nv21(&RawFrame::planar(w as u32, h as u32, &planes)).unwrap();
            assert_eq!(frame.as_bytes().len(), w * h * 3 / 2, "{w}x{h}");
        }
    }

    #[test]
    fn padded_rows_are_skipped() {
        // 4x2 luma with 3 bytes of padding per row.
        let y = vec![1, 2, 3, 4, 0xEE, 0xEE, 0xEE, 5, 6, 7, 8, 0xEE, 0xEE, 0xEE];
        let u = vec![9, 10];
        let v = vec![11, 12];
        let planes = [
            Plane::new(&y, 7, 1),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 2, 1),
        ];
        let frame = yuv420_to_nv21(&RawFrame::planar(4, 2, &planes)).unwrap();
        assert_eq!(frame.luma(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(frame.chroma(), &[11, 9, 12, 10]);
    }

    #[test]
    fn luma_slow_path_reads_every_second_byte() {
        // Stride-2 luma: each sample is followed by a junk byte.
        let width = 4usize;
        let height = 4usize;
        let row_stride = 10;
        let mut y = vec![0xAAu8; row_stride * height];
        for r in 0..height {
            for c in 0..width {
                y[r * row_stride + c * 2] = (r * width + c) as u8;
            }
        }
        let u = vec![0u8; 4];
        let v = vec![0u8; 4];
        let planes = [
            Plane::new(&y, row_stride, 2),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 2, 1),
        ];
        let frame = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap();

        for r in 0..height {
            for c in 0..width {
                assert_eq!(
                    frame.luma()[r * width + c],
                    y[r * row_stride + c * 2],
                    "mismatch at ({r},{c})"
                );
            }
        }
    }

    #[test]
    fn chroma_planes_are_read_with_independent_strides() {
        // U tight, V with pixel stride 2 and padded rows.
        let u = vec![1, 2, 3, 4];
        let v = vec![10, 0, 20, 0, 0, 30, 0, 40, 0, 0];
        let y = vec![0u8; 16];
        let planes = [
            Plane::new(&y, 4, 1),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 5, 2),
        ];
        let frame = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap();
        assert_eq!(frame.chroma(), &[10, 1, 20, 2, 30, 3, 40, 4]);
    }

    #[test]
    fn swapping_chroma_planes_swaps_each_pair_only() {
        let (y, u, v) = tight_planes(8, 6, 40, 90);
        let forward = [
            Plane::new(&y, 8, 1),
            Plane::new(&u, 4, 1),
            Plane::new(&v, 4, 1),
        ];
        let swapped = [
            Plane::new(&y, 8, 1),
            Plane::new(&v, 4, 1),
            Plane::new(&u, 4, 1),
        ];
        let a = yuv420_to_nv21(&RawFrame::planar(8, 6, &forward)).unwrap();
        let b = yuv420_to_nv21(&RawFrame::planar(8, 6, &swapped)).unwrap();

        assert_eq!(a.luma(), b.luma());
        for (pa, pb) in a.chroma().chunks_exact(2).zip(b.chroma().chunks_exact(2)) {
            assert_eq!(pa[0], pb[1]);
            assert_eq!(pa[1], pb[0]);
        }
    }

    #[test]
    fn android_style_aliased_planes_convert_to_nv21() {
        // One VU buffer with U and V views offset by a byte, pixel stride 2.
        let vu = vec![11u8, 21, 12, 22, 13, 23, 14, 24];
        let y = vec![0u8; 16];
        let planes = [
            Plane::new(&y, 4, 1),
            Plane::new(&vu[1..], 4, 2),
            Plane::new(&vu, 4, 2),
        ];
        let frame = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap();
        assert_eq!(frame.chroma(), vu.as_slice());
    }

    #[test]
    fn semi_planar_nv12_is_reordered_to_vu() {
        let y = vec![0u8; 16];
        let uv = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let planes = [Plane::new(&y, 4, 1), Plane::new(&uv, 4, 2)];
        let frame =
            yuv420_to_nv21(&RawFrame::semi_planar(4, 4, &planes, ChromaOrder::Uv)).unwrap();
        assert_eq!(frame.chroma(), &[2, 1, 4, 3, 6, 5, 8, 7]);
    }

    #[test]
    fn semi_planar_nv21_is_copied_unchanged() {
        let y = vec![0u8; 16];
        let vu = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let planes = [Plane::new(&y, 4, 1), Plane::new(&vu, 4, 2)];
        let frame =
            yuv420_to_nv21(&RawFrame::semi_planar(4, 4, &planes, ChromaOrder::Vu)).unwrap();
        assert_eq!(frame.chroma(), vu.as_slice());
    }

    #[test]
    fn rejects_odd_dimensions() {
        let (y, u, v) = tight_planes(4, 4, 0, 0);
        let planes = [
            Plane::new(&y, 4, 1),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 2, 1),
        ];
        let err = yuv420_to_nv21(&RawFrame::planar(3, 4, &planes)).unwrap_err();
        assert_eq!(err, ConvertError::InvalidDimensions { width: 3, height: 4 });
    }

    #[test]
    fn rejects_wrong_plane_count() {
        let y = vec![0u8; 16];
        let planes = [Plane::new(&y, 4, 1)];
        let err = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap_err();
        assert_eq!(err, ConvertError::PlaneCount(1));
    }

    #[test]
    fn rejects_zero_pixel_stride() {
        let (y, u, v) = tight_planes(4, 4, 0, 0);
        let planes = [
            Plane::new(&y, 4, 0),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 2, 1),
        ];
        let err = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidStride { plane: "luma", .. }));
    }

    #[test]
    fn rejects_overlapping_rows() {
        let (y, u, v) = tight_planes(4, 4, 0, 0);
        let planes = [
            Plane::new(&y, 3, 1),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 2, 1),
        ];
        let err = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidStride { .. }));
    }

    #[test]
    fn rejects_short_chroma_plane() {
        let (y, u, _) = tight_planes(4, 4, 0, 0);
        let short_v = vec![0u8; 3];
        let planes = [
            Plane::new(&y, 4, 1),
            Plane::new(&u, 2, 1),
            Plane::new(&short_v, 2, 1),
        ];
        let err = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap_err();
        assert_eq!(
            err,
            ConvertError::PlaneTooShort {
                plane: "V",
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn overflowing_strides_are_rejected() {
        let (y, u, v) = tight_planes(4, 4, 0, 0);
        let planes = [
            Plane::new(&y, usize::MAX, 1),
            Plane::new(&u, 2, 1),
            Plane::new(&v, 2, 1),
        ];
        let err = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidStride { .. }));

        let planes = [
            Plane::new(&y, 4, 1),
            Plane::new(&u, 2, usize::MAX),
            Plane::new(&v, 2, 1),
        ];
        let err = yuv420_to_nv21(&RawFrame::planar(4, 4, &planes)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidStride { .. }));

        let chroma = vec![0u8; 8];
        let planes = [Plane::new(&y, 4, 1), Plane::new(&chroma, usize::MAX, 2)];
        let err = yuv420_to_nv21(&RawFrame::semi_planar(4, 4, &planes, ChromaOrder::Vu))
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidStride { .. }));
    }

    #[test]
    fn semi_planar_requires_pair_stride() {
        let y = vec![0u8; 16];
        let uv = vec![0u8; 8];
        let planes = [Plane::new(&y, 4, 1), Plane::new(&uv, 4, 1)];
        let err =
            yuv420_to_nv21(&RawFrame::semi_planar(4, 4, &planes, ChromaOrder::Uv)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidStride { plane: "chroma", .. }));
    }

    #[test]
    fn nv21_to_rgba_decodes_neutral_gray() {
        // Y=128, no chroma: every channel stays at 128, alpha opaque.
        let mut data = vec![128u8; 4];
        data.extend_from_slice(&[128, 128]);
        let frame = CanonicalFrame::from_bytes(data, Dimensions::new(2, 2)).unwrap();
        let rgba = nv21_to_rgba(&frame);
        assert_eq!(rgba.len(), 16);
        for px in rgba.chunks_exact(4) {
            assert_eq!(px, &[128, 128, 128, 255]);
        }
    }

    #[test]
    fn nv21_to_rgba_reads_v_before_u() {
        // Strong V (red difference), neutral U: red channel dominates.
        let mut data = vec![100u8; 4];
        data.extend_from_slice(&[228, 128]);
        let frame = CanonicalFrame::from_bytes(data, Dimensions::new(2, 2)).unwrap();
        let rgba = nv21_to_rgba(&frame);
        assert!(rgba[0] > rgba[2], "red {} should exceed blue {}", rgba[0], rgba[2]);
    }
}
