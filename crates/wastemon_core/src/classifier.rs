//! Client side of the remote classification service.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::future::Future;

use crate::config::ClientConfig;
use crate::error::ClassifyError;
use crate::queue::{Category, Upload};

/// Something that can turn an uploaded image into a waste category.
pub trait Classifier: Send + Sync + 'static {
    fn classify(
        &self,
        upload: Upload,
    ) -> impl Future<Output = Result<Category, ClassifyError>> + Send;
}

/// Posts each image as multipart form data to `<api_url>/classify`.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(config: &ClientConfig) -> Result<Self, ClassifyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let endpoint = config.classify_endpoint();
        let client = builder.build().map_err(|source| ClassifyError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;
        Ok(Self { client, endpoint })
    }

    /// Use a preconfigured client, e.g. one with custom proxy or TLS settings.
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoint: config.classify_endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Classifier for HttpClassifier {
    fn classify(
        &self,
        upload: Upload,
    ) -> impl Future<Output = Result<Category, ClassifyError>> + Send {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        async move {
            let transport = |source: reqwest::Error| ClassifyError::Transport {
                endpoint: endpoint.clone(),
                source,
            };
            let part = Part::bytes(upload.source.bytes().to_vec())
                .file_name(upload.name.clone())
                .mime_str(&upload.mime)
                .map_err(transport)?;
            let form = Form::new().part("file", part);

            let response = client
                .post(&endpoint)
                .multipart(form)
                .send()
                .await
                .map_err(transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClassifyError::Status {
                    status: status.as_u16(),
                });
            }
            let body = response.bytes().await.map_err(transport)?;
            let category = parse_response(&body)?;
            tracing::debug!("{} classified as {}", upload.name, category);
            Ok(category)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    prediction: PredictionBody,
}

#[derive(Debug, Deserialize)]
struct PredictionBody {
    #[serde(rename = "class")]
    class_name: String,
}

/// Extract `prediction.class` from a classifier response body.
pub fn parse_response(body: &[u8]) -> Result<Category, ClassifyError> {
    let parsed: ClassifyResponse =
        serde_json::from_slice(body).map_err(|e| ClassifyError::Malformed(e.to_string()))?;
    let label = parsed.prediction.class_name.trim();
    if label.is_empty() {
        return Err(ClassifyError::Malformed("empty prediction class".to_string()));
    }
    Ok(Category::parse(label))
}
