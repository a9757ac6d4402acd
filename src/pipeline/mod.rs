// The three-stage request pipeline: detect, annotate, store.
//
// Stages are composed explicitly so data flow and error boundaries stay
// visible; there is no shared mutable state between requests.

use tracing::{info, instrument};

use crate::core::config::Config;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::types::UploadedImage;
use crate::services::annotation::annotate;
use crate::services::inference::InferenceClient;
use crate::services::storage::StorageClient;

/// Run the full pipeline for one uploaded image and return the public URL of
/// the annotated result.
///
/// Both stage clients are constructed up front, so a missing configuration
/// variable surfaces before any network call is attempted. A failure at any
/// stage aborts the pipeline; nothing is uploaded on a partial run.
#[instrument(skip(config, http, image), fields(filename = %image.filename))]
pub async fn run(
    config: &Config,
    http: &reqwest::Client,
    image: UploadedImage,
) -> PipelineResult<String> {
    if image.bytes.is_empty() {
        return Err(PipelineError::Validation("empty file provided".to_string()));
    }

    let inference = InferenceClient::new(&config.inference, http.clone())?;
    let storage = StorageClient::new(&config.storage, http.clone())?;

    let detection = inference.detect(&image).await?;
    let annotated = annotate(&image, detection.bbox).await?;
    let url = storage.upload(&annotated).await?;

    info!(results_url = %url, "pipeline complete");
    Ok(url)
}
