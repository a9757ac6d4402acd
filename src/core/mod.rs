pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{
    AnnotationError, ConfigError, InferenceError, PipelineError, StorageError,
};
pub use types::{
    AnnotatedImage, BoundingBox, DetectionResult, InferenceResponse, UploadedImage,
};
