// Custom error types for better error handling and debugging
//
// Using thiserror for ergonomic error definitions with:
// - Context preservation
// - Type-safe error matching
// - Automatic Display/Error trait implementations
// - Source error chaining

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("confidence threshold must be in [0.0, 1.0], got {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("IoU threshold must be in [0.0, 1.0], got {0}")]
    InvalidIoUThreshold(f32),

    #[error("target size must be between 320 and 2048, got {0}")]
    InvalidTargetSize(u32),

    #[error("invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),
}

/// Inference client errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("empty image upload")]
    EmptyImage,

    #[error("inference request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("inference API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("failed to parse inference response: {0}")]
    InvalidResponse(String),
}

/// Annotation engine errors
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("image task join failed: {0}")]
    TaskJoin(String),
}

/// Storage uploader errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("storage upload failed with {status}: {body}")]
    UploadFailed { status: u16, body: String },
}

/// Top-level pipeline error, surfaced to HTTP callers as a uniform
/// `{"detail": ...}` body.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// HTTP status for this error: 400 for caller input problems, 500 for
    /// configuration, upstream, codec, and storage failures.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_)
            | PipelineError::Inference(InferenceError::EmptyImage) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

// Convenience type aliases for Results
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type InferenceResult<T> = Result<T, InferenceError>;
pub type AnnotationResult<T> = Result<T, AnnotationError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
