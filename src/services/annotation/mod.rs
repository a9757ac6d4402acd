// Annotation stage: draw the detected bounding box on the uploaded image
// (or pass it through untouched) and re-encode to JPEG.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::{debug, instrument};

use crate::core::errors::{AnnotationError, AnnotationResult};
use crate::core::types::{AnnotatedImage, BoundingBox, UploadedImage};
use crate::utils::image_ops::encode_jpeg;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;

/// Produce the annotated (or pass-through) JPEG for an upload.
///
/// Decode, draw and encode all run in a single blocking task; everything is
/// in-memory, so there are no temporary files to clean up on any exit path.
#[instrument(skip(image), fields(filename = %image.filename, boxed = bbox.is_some()))]
pub async fn annotate(
    image: &UploadedImage,
    bbox: Option<BoundingBox>,
) -> AnnotationResult<AnnotatedImage> {
    let bytes = image.bytes.clone();
    let filename = format!("output_{}", image.filename);

    let jpeg_bytes = tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory(&bytes).map_err(AnnotationError::Decode)?;
        let mut raster = decoded.to_rgb8();

        if let Some(bbox) = bbox {
            draw_box_outline(&mut raster, &bbox);
        }

        encode_jpeg(&DynamicImage::ImageRgb8(raster)).map_err(AnnotationError::Encode)
    })
    .await
    .map_err(|e| AnnotationError::TaskJoin(e.to_string()))??;

    debug!(output = %filename, size = jpeg_bytes.len(), "annotation complete");

    Ok(AnnotatedImage {
        bytes: jpeg_bytes,
        filename,
    })
}

/// Draw a hollow rectangle outline at the box coordinates.
///
/// The upstream service does not guarantee ordered or in-bounds coordinates;
/// clamp to the image and skip rectangles that are degenerate afterwards.
fn draw_box_outline(image: &mut RgbImage, bbox: &BoundingBox) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let x1 = bbox.x1.clamp(0, w - 1);
    let y1 = bbox.y1.clamp(0, h - 1);
    let x2 = bbox.x2.clamp(0, w - 1);
    let y2 = bbox.y2.clamp(0, h - 1);

    for inset in 0..BOX_THICKNESS {
        let (ix1, iy1, ix2, iy2) = (x1 + inset, y1 + inset, x2 - inset, y2 - inset);
        if ix1 >= ix2 || iy1 >= iy2 {
            break;
        }
        let rect = Rect::at(ix1, iy1).of_size((ix2 - ix1 + 1) as u32, (iy2 - iy1 + 1) as u32);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }
}
