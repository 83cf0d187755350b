use serde::{Deserialize, Serialize};

/// Width and height of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of an NV21 buffer: full-resolution luma plus
    /// half-resolution interleaved chroma.
    pub fn canonical_len(&self) -> usize {
        self.pixels() * 3 / 2
    }

    /// Byte length of an RGBA buffer.
    pub fn rgba_len(&self) -> usize {
        self.pixels() * 4
    }

    /// Both dimensions even and non-zero, as 4:2:0 subsampling requires.
    pub fn is_even_nonzero(&self) -> bool {
        self.width > 0 && self.height > 0 && self.width % 2 == 0 && self.height % 2 == 0
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A frame in the canonical NV21 layout: `width*height` luma bytes followed by
/// `width*height/2` bytes of interleaved chroma, V before U.
///
/// Produced only by the converter, so the length invariant always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFrame {
    data: Vec<u8>,
    dims: Dimensions,
}

impl CanonicalFrame {
    /// Wrap a buffer that already has the canonical length.
    ///
    /// Returns `None` when the length or dimensions do not match.
    pub fn from_bytes(data: Vec<u8>, dims: Dimensions) -> Option<Self> {
        if !dims.is_even_nonzero() || data.len() != dims.canonical_len() {
            return None;
        }
        Some(Self { data, dims })
    }

    pub(crate) fn from_parts_unchecked(data: Vec<u8>, dims: Dimensions) -> Self {
        debug_assert_eq!(data.len(), dims.canonical_len());
        Self { data, dims }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> u32 {
        self.dims.width
    }

    pub fn height(&self) -> u32 {
        self.dims.height
    }

    /// The whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The full-resolution luma plane.
    pub fn luma(&self) -> &[u8] {
        &self.data[..self.dims.pixels()]
    }

    /// The interleaved VU chroma plane.
    pub fn chroma(&self) -> &[u8] {
        &self.data[self.dims.pixels()..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Processed RGBA output ready for texture upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ProcessedFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the payload is exactly `width*height*4` bytes.
    pub fn has_rgba_len(&self) -> bool {
        self.data.len() == self.dimensions().rgba_len()
    }
}
