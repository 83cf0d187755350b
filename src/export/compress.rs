use image::codecs::png::PngEncoder;
use image::{ImageBuffer, Rgba};

use crate::export::ExportError;

/// Encode tightly packed RGBA pixel data as PNG.
pub fn encode_png(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExportError> {
    let img: ImageBuffer<Rgba<u8>, _> =
        ImageBuffer::from_raw(width, height, data).ok_or(ExportError::InvalidBuffer {
            width,
            height,
            len: data.len(),
        })?;

    let mut buf = Vec::new();
    img.write_with_encoder(PngEncoder::new(&mut buf))?;
    Ok(buf)
}

/// Downscale RGBA data and encode it as PNG.
///
/// Uses `fast_image_resize` for SIMD-accelerated resizing.
pub fn encode_thumbnail(
    data: &[u8],
    width: u32,
    height: u32,
    thumb_width: u32,
    thumb_height: u32,
) -> Result<Vec<u8>, ExportError> {
    use fast_image_resize as fr;
    use fr::images::Image;

    let src_image = Image::from_vec_u8(width, height, data.to_vec(), fr::PixelType::U8x4)
        .map_err(|e| ExportError::Resize(e.to_string()))?;
    let mut dst_image = Image::new(thumb_width, thumb_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, None)
        .map_err(|e| ExportError::Resize(e.to_string()))?;

    encode_png(&dst_image.into_vec(), thumb_width, thumb_height)
}

/// Largest size no wider than `max_width` that keeps the aspect ratio.
pub fn fit_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width) / u64::from(width)).max(1);
    (max_width, scaled as u32)
}
