use crate::core::errors::ConfigError;
use std::env;
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

/// CORS configuration
///
/// Allow-list of origins (local dev origin plus the production origin),
/// overridable via CORS_ALLOWED_ORIGINS without code changes.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Inference API configuration
///
/// The key, model and endpoint are required by the inference stage but kept
/// optional here: a missing variable fails the stage that needs it with a
/// configuration error instead of preventing startup.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub target_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl InferenceConfig {
    /// Resolve the required settings, failing on the first missing variable.
    pub fn resolve(&self) -> Result<(&str, &str, &str), ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("ULTRALYTICS_API_KEY"))?;
        let model = self
            .model
            .as_deref()
            .ok_or(ConfigError::MissingVar("ULTRALYTICS_MODEL_URL"))?;
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ConfigError::MissingVar("ULTRALYTICS_INFERENCE_URL"))?;
        Ok((api_key, model, endpoint))
    }
}

/// Storage service configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub bucket: Option<String>,
}

impl StorageConfig {
    /// Resolve the required settings, failing on the first missing variable.
    pub fn resolve(&self) -> Result<(&str, &str, &str), ConfigError> {
        let url = self
            .url
            .as_deref()
            .ok_or(ConfigError::MissingVar("SUPABASE_URL"))?;
        let service_key = self
            .service_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("SUPABASE_SERVICE_KEY"))?;
        let bucket = self
            .bucket
            .as_deref()
            .ok_or(ConfigError::MissingVar("SUPABASE_BUCKET"))?;
        Ok((url, service_key, bucket))
    }
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env();
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Self {
        // Parse log level
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Self {
            server: ServerConfig {
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8000),
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                log_level,
                max_body_bytes: env::var("MAX_BODY_BYTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(25 * 1024 * 1024),
            },
            cors: CorsConfig { allowed_origins },
            inference: InferenceConfig {
                api_key: env::var("ULTRALYTICS_API_KEY").ok().filter(|s| !s.is_empty()),
                model: env::var("ULTRALYTICS_MODEL_URL").ok().filter(|s| !s.is_empty()),
                endpoint: env::var("ULTRALYTICS_INFERENCE_URL")
                    .ok()
                    .filter(|s| !s.is_empty()),
                target_size: env::var("TARGET_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(640),
                confidence_threshold: env::var("CONFIDENCE_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.25),
                iou_threshold: env::var("IOU_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.45),
            },
            storage: StorageConfig {
                url: env::var("SUPABASE_URL").ok().filter(|s| !s.is_empty()),
                service_key: env::var("SUPABASE_SERVICE_KEY")
                    .ok()
                    .filter(|s| !s.is_empty()),
                bucket: env::var("SUPABASE_BUCKET").ok().filter(|s| !s.is_empty()),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Validate detection thresholds
        if !(0.0..=1.0).contains(&self.inference.confidence_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.inference.confidence_threshold,
            ));
        }

        if !(0.0..=1.0).contains(&self.inference.iou_threshold) {
            return Err(ConfigError::InvalidIoUThreshold(self.inference.iou_threshold));
        }

        // Validate target size
        if !(320..=2048).contains(&self.inference.target_size) {
            return Err(ConfigError::InvalidTargetSize(self.inference.target_size));
        }

        // Validate origins parse as header values so the CORS layer cannot
        // panic at startup
        for origin in &self.cors.allowed_origins {
            if origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(ConfigError::InvalidCorsOrigin(origin.clone()));
            }
        }

        Ok(())
    }
}

// Note: No Default implementation because Config::new() can fail
// Users should explicitly call Config::new()? and handle errors
