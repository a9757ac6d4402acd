// Request-scoped values flowing through the inference pipeline

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An uploaded image as received at the HTTP boundary.
///
/// Immutable once constructed; the byte buffer is shared between the
/// inference and annotation stages without copying.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub bytes: Arc<Vec<u8>>,
}

impl UploadedImage {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: Arc::new(bytes),
        }
    }
}

/// Bounding box in integer pixel coordinates.
///
/// The upstream API reports float coordinates; they are truncated to integers
/// on extraction. Coordinates are not guaranteed to be ordered or within image
/// bounds, the annotation stage clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Outcome of the inference stage: the first detected box, if any, plus the
/// raw decoded upstream response for diagnostics.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub bbox: Option<BoundingBox>,
    pub raw: serde_json::Value,
}

/// Encoded output of the annotation stage, ready for upload.
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    /// JPEG-encoded image bytes (boxed or pass-through).
    pub bytes: Vec<u8>,
    /// Derived storage filename: `output_` + the original filename.
    pub filename: String,
}

/// Success body for `POST /inference/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(rename = "resultsUrl")]
    pub results_url: String,
}
