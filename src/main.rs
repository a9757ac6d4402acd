// Main entry point for the inference gateway

use inference_gateway::{
    core::{
        types::{InferenceResponse, UploadedImage},
        Config, PipelineError,
    },
    pipeline,
};

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::HeaderValue,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    http: reqwest::Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Arc::new(Config::new().context("Failed to load configuration")?);

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "inference_gateway={}",
        match config.server.log_level {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Shared HTTP client for both outbound stages
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .context("Failed to create HTTP client")?;

    let state = AppState {
        config: config.clone(),
        http,
    };

    // Setup CORS from the configured origin allow-list
    let origins = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid CORS origin")?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    // Create router
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/inference/", post(run_inference))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /            - Root endpoint");
    info!("  GET  /health      - Health check");
    info!("  POST /inference/  - Detect, annotate and store an image (multipart/form-data)");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> &'static str {
    "Inference Gateway"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Inference endpoint
///
/// # Request Format:
/// - multipart/form-data with a single image file field
///
/// # Response:
/// - `{"resultsUrl": <public URL of the annotated image>}`
async fn run_inference(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<InferenceResponse>, PipelineError> {
    let mut upload: Option<UploadedImage> = None;

    // Take the first field carrying a filename as the upload
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::Validation(format!("Multipart error: {e}")))?
    {
        let Some(filename) = field.file_name().map(String::from) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| PipelineError::Validation(format!("Error reading file: {e}")))?;

        upload = Some(UploadedImage::new(filename, content_type, data.to_vec()));
        break;
    }

    let Some(upload) = upload else {
        return Err(PipelineError::Validation("no file provided".to_string()));
    };
    if upload.bytes.is_empty() {
        return Err(PipelineError::Validation("empty file provided".to_string()));
    }

    info!(filename = %upload.filename, size = upload.bytes.len(), "Received inference request");

    let results_url = pipeline::run(&state.config, &state.http, upload)
        .await
        .map_err(|e| {
            if e.status_code().is_server_error() {
                error!("Inference pipeline failed: {e}");
            }
            e
        })?;

    Ok(Json(InferenceResponse { results_url }))
}
