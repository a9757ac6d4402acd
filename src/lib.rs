// Library exports for the inference gateway

// Core modules
pub mod core;
pub mod pipeline;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use crate::core::{
    config::Config,
    errors::{AnnotationError, ConfigError, InferenceError, PipelineError, StorageError},
    types::{AnnotatedImage, BoundingBox, DetectionResult, InferenceResponse, UploadedImage},
};

pub use crate::services::{annotate, InferenceClient, StorageClient};
