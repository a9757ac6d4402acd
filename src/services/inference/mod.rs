// Inference stage: submit the uploaded image to the external detection API
// and normalize the response into an optional bounding box.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::config::InferenceConfig;
use crate::core::errors::{ConfigError, InferenceError, InferenceResult};
use crate::core::types::{BoundingBox, DetectionResult, UploadedImage};

/// Client for the external object-detection API.
///
/// One instance per request; construction validates that the required
/// configuration is present before any network call is attempted.
pub struct InferenceClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    target_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

/// Expected response shape: `{"images":[{"results":[{"box":{...}}]}]}`.
///
/// Everything is defaulted so that absent images/results/box decode to an
/// explicit "no detection" rather than a parse failure; only a structurally
/// malformed body (wrong types, non-JSON) is an error.
#[derive(Debug, Default, Deserialize)]
struct InferencePayload {
    #[serde(default)]
    images: Vec<ImageEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageEntry {
    #[serde(default)]
    results: Vec<ResultEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultEntry {
    #[serde(rename = "box", default)]
    bbox: Option<RawBox>,
}

/// Box object as reported upstream: float coordinates, any of which may be
/// missing (an incomplete box counts as no detection).
#[derive(Debug, Deserialize)]
struct RawBox {
    x1: Option<f64>,
    y1: Option<f64>,
    x2: Option<f64>,
    y2: Option<f64>,
}

impl RawBox {
    /// Truncate to integer pixel coordinates; None if any coordinate is absent.
    fn complete(&self) -> Option<BoundingBox> {
        Some(BoundingBox {
            x1: self.x1? as i32,
            y1: self.y1? as i32,
            x2: self.x2? as i32,
            y2: self.y2? as i32,
        })
    }
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let (api_key, model, endpoint) = config.resolve()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: endpoint.to_string(),
            target_size: config.target_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        })
    }

    /// Run detection on the uploaded image.
    ///
    /// Single attempt, no retry. Returns the first box of the first image
    /// entry, or `bbox: None` when the response carries no usable detection.
    #[instrument(skip(self, image), fields(filename = %image.filename, size = image.bytes.len()))]
    pub async fn detect(&self, image: &UploadedImage) -> InferenceResult<DetectionResult> {
        if image.bytes.is_empty() {
            return Err(InferenceError::EmptyImage);
        }

        let part = Part::bytes(image.bytes.as_ref().clone())
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)?;

        let form = Form::new()
            .text("model", self.model.clone())
            .text("imgsz", self.target_size.to_string())
            .text("conf", self.confidence_threshold.to_string())
            .text("iou", self.iou_threshold.to_string())
            .part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Best-effort JSON body for diagnostics, raw text as fallback
            let body = match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => serde_json::to_string(&value).unwrap_or(text),
                Err(_) => text,
            };
            return Err(InferenceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;
        debug!(response = %raw, "inference API response");

        let payload: InferencePayload = serde_json::from_value(raw.clone())
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let bbox = payload
            .images
            .first()
            .and_then(|entry| entry.results.first())
            .and_then(|result| result.bbox.as_ref())
            .and_then(RawBox::complete);

        if bbox.is_none() {
            debug!("no detection in inference response");
        }

        Ok(DetectionResult { bbox, raw })
    }
}
