use serde::{Deserialize, Serialize};

/// One channel of a captured image with its own memory layout.
///
/// `row_stride` is the byte distance between the starts of successive rows,
/// `pixel_stride` the byte distance between successive samples in a row.
/// Both may exceed the tight packing implied by the image width.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl<'a> Plane<'a> {
    pub fn new(data: &'a [u8], row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Minimum buffer length needed to address `rows` x `cols` samples with
    /// this plane's strides. Zero when either extent is zero; `None` when the
    /// strides overflow the address space.
    pub fn required_len(&self, rows: usize, cols: usize) -> Option<usize> {
        if rows == 0 || cols == 0 {
            return Some(0);
        }
        let last_row = (rows - 1).checked_mul(self.row_stride)?;
        let last_col = (cols - 1).checked_mul(self.pixel_stride)?;
        last_row.checked_add(last_col)?.checked_add(1)
    }
}

/// Channel order of the interleaved chroma plane in a two-plane capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromaOrder {
    /// U then V (NV12).
    #[default]
    Uv,
    /// V then U (NV21).
    Vu,
}

/// A single captured YUV 4:2:0 image, lent by the capture source for the
/// duration of one conversion.
///
/// Three planes are `[Y, U, V]`. Two planes are `[Y, interleaved chroma]`
/// with `chroma_order` naming which component comes first.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub planes: &'a [Plane<'a>],
    pub chroma_order: ChromaOrder,
    /// Capture timestamp in microseconds since the source started.
    pub timestamp_us: u64,
}

impl<'a> RawFrame<'a> {
    /// A three-plane `[Y, U, V]` frame.
    pub fn planar(width: u32, height: u32, planes: &'a [Plane<'a>]) -> Self {
        Self {
            width,
            height,
            planes,
            chroma_order: ChromaOrder::Uv,
            timestamp_us: 0,
        }
    }

    /// A two-plane `[Y, chroma]` frame with the given interleave order.
    pub fn semi_planar(
        width: u32,
        height: u32,
        planes: &'a [Plane<'a>],
        chroma_order: ChromaOrder,
    ) -> Self {
        Self {
            width,
            height,
            planes,
            chroma_order,
            timestamp_us: 0,
        }
    }

    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_len_for_tight_plane() {
        let data = [0u8; 16];
        let plane = Plane::new(&data, 4, 1);
        assert_eq!(plane.required_len(4, 4), Some(16));
    }

    #[test]
    fn required_len_accounts_for_padding_and_pixel_stride() {
        let data = [0u8; 64];
        // 2 rows of 3 samples, stride-2 samples, 10-byte rows.
        let plane = Plane::new(&data, 10, 2);
        assert_eq!(plane.required_len(2, 3), Some(10 + 4 + 1));
    }

    #[test]
    fn required_len_is_zero_for_empty_extent() {
        let plane = Plane::new(&[], 8, 1);
        assert_eq!(plane.required_len(0, 4), Some(0));
        assert_eq!(plane.required_len(4, 0), Some(0));
    }

    #[test]
    fn chroma_order_serialises_lowercase() {
        assert_eq!(serde_json::to_value(ChromaOrder::Vu).unwrap(), "vu");
        let parsed: ChromaOrder = serde_json::from_str("\"uv\"").unwrap();
        assert_eq!(parsed, ChromaOrder::Uv);
    }

    #[test]
    fn planar_constructor_defaults_timestamp() {
        let planes: [Plane<'_>; 0] = [];
        let frame = RawFrame::planar(4, 2, &planes).with_timestamp(99);
        assert_eq!(frame.timestamp_us, 99);
        assert_eq!(frame.width, 4);
    }
}
