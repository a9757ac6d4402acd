// Storage stage: persist the annotated JPEG to the object-storage bucket and
// return its public URL.

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use tracing::{debug, instrument};

use crate::core::config::StorageConfig;
use crate::core::errors::{ConfigError, StorageError, StorageResult};
use crate::core::types::AnnotatedImage;

/// Object keys live under a fixed prefix so repeated uploads of the same
/// filename replace each other instead of accumulating.
const OBJECT_PREFIX: &str = "inference";

/// Uploaded objects are publicly cacheable for one hour.
const OBJECT_CACHE_CONTROL: &str = "max-age=3600";

/// Client for the storage service's object API.
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(config: &StorageConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let (url, service_key, bucket) = config.resolve()?;
        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// Upload the annotated image under its deterministic key.
    ///
    /// Upsert semantics: an existing object at the same key is overwritten.
    #[instrument(skip(self, image), fields(filename = %image.filename, size = image.bytes.len()))]
    pub async fn upload(&self, image: &AnnotatedImage) -> StorageResult<String> {
        let key = format!("{OBJECT_PREFIX}/{}", image.filename);
        let upload_url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, key
        );

        let response = self
            .http
            .post(&upload_url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(CACHE_CONTROL, OBJECT_CACHE_CONTROL)
            .header(CONTENT_TYPE, "image/jpeg")
            .body(image.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }

        let public_url = self.public_url(&key);
        debug!(url = %public_url, "upload complete");
        Ok(public_url)
    }

    /// Public URL for an object key in the configured bucket.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct RecordedUpload {
        bucket: String,
        key: String,
        authorization: Option<String>,
        upsert: Option<String>,
        cache_control: Option<String>,
        content_type: Option<String>,
        body_len: usize,
    }

    struct MockStorage {
        status: StatusCode,
        uploads: Mutex<Vec<RecordedUpload>>,
    }

    impl MockStorage {
        fn new(status: StatusCode) -> Arc<Self> {
            Arc::new(Self {
                status,
                uploads: Mutex::new(Vec::new()),
            })
        }
    }

    async fn object_handler(
        State(mock): State<Arc<MockStorage>>,
        Path((bucket, key)): Path<(String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> (StatusCode, String) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };

        mock.uploads.lock().unwrap().push(RecordedUpload {
            bucket,
            key,
            authorization: header("authorization"),
            upsert: header("x-upsert"),
            cache_control: header("cache-control"),
            content_type: header("content-type"),
            body_len: body.len(),
        });

        (mock.status, r#"{"Key":"ignored"}"#.to_string())
    }

    async fn spawn_storage(mock: Arc<MockStorage>) -> String {
        let app = Router::new()
            .route("/storage/v1/object/:bucket/*key", post(object_handler))
            .with_state(mock);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn test_config(url: &str) -> StorageConfig {
        StorageConfig {
            url: Some(url.to_string()),
            service_key: Some("service-key".to_string()),
            bucket: Some("test-bucket".to_string()),
        }
    }

    fn test_image() -> AnnotatedImage {
        AnnotatedImage {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
            filename: "output_dog.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn upload_uses_deterministic_key_and_upsert_headers() {
        let mock = MockStorage::new(StatusCode::OK);
        let base = spawn_storage(mock.clone()).await;

        let client = StorageClient::new(&test_config(&base), reqwest::Client::new()).unwrap();
        let image = test_image();
        let url = client.upload(&image).await.unwrap();

        assert_eq!(
            url,
            format!("{base}/storage/v1/object/public/test-bucket/inference/output_dog.jpg")
        );

        let uploads = mock.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let recorded = &uploads[0];
        assert_eq!(recorded.bucket, "test-bucket");
        assert_eq!(recorded.key, "inference/output_dog.jpg");
        assert_eq!(recorded.authorization.as_deref(), Some("Bearer service-key"));
        assert_eq!(recorded.upsert.as_deref(), Some("true"));
        assert_eq!(recorded.cache_control.as_deref(), Some("max-age=3600"));
        assert_eq!(recorded.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(recorded.body_len, image.bytes.len());
    }

    #[tokio::test]
    async fn repeated_uploads_hit_the_same_key() {
        let mock = MockStorage::new(StatusCode::OK);
        let base = spawn_storage(mock.clone()).await;

        let client = StorageClient::new(&test_config(&base), reqwest::Client::new()).unwrap();
        let first = client.upload(&test_image()).await.unwrap();
        let second = client.upload(&test_image()).await.unwrap();

        assert_eq!(first, second);
        let uploads = mock.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].key, uploads[1].key);
        assert_eq!(uploads[1].upsert.as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn provider_error_is_propagated_with_status_and_body() {
        let mock = MockStorage::new(StatusCode::FORBIDDEN);
        let base = spawn_storage(mock).await;

        let client = StorageClient::new(&test_config(&base), reqwest::Client::new()).unwrap();
        let err = client.upload(&test_image()).await.unwrap_err();

        match err {
            StorageError::UploadFailed { status, body } => {
                assert_eq!(status, 403);
                assert!(!body.is_empty());
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_normalized() {
        let mock = MockStorage::new(StatusCode::OK);
        let base = spawn_storage(mock.clone()).await;

        let config = test_config(&format!("{base}/"));
        let client = StorageClient::new(&config, reqwest::Client::new()).unwrap();
        let url = client.upload(&test_image()).await.unwrap();

        assert!(!url.contains("//storage"));
        assert_eq!(mock.uploads.lock().unwrap().len(), 1);
    }

    #[test]
    fn new_fails_without_bucket() {
        let mut config = test_config("http://127.0.0.1:1");
        config.bucket = None;
        assert!(StorageClient::new(&config, reqwest::Client::new()).is_err());
    }
}
