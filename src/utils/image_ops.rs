use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Encode an image to JPEG bytes in memory.
///
/// JPEG encoding is CPU-intensive; callers on the async runtime should wrap
/// this in spawn_blocking.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut jpeg_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut jpeg_bytes);
    img.write_to(&mut cursor, ImageFormat::Jpeg)?;
    Ok(jpeg_bytes)
}

/// Encode an image to PNG bytes in memory.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut png_bytes);
    img.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(png_bytes)
}
