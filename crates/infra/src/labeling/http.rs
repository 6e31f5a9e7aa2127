use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use catalog_products::{ConfidenceLabel, MAX_LABELS};

use super::{ClassifierError, LabelClassifier};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectLabelsRequest<'a> {
    bucket: &'a str,
    key: &'a str,
    max_labels: usize,
}

#[derive(Debug, Deserialize)]
struct DetectLabelsResponse {
    #[serde(default)]
    labels: Vec<ConfidenceLabel>,
}

/// Classifier reached over HTTP.
///
/// Posts `{"bucket", "key", "maxLabels"}` to the endpoint and expects
/// `{"labels": [{"name", "confidence"}]}` back.
#[derive(Debug, Clone)]
pub struct HttpLabelClassifier {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
}

impl HttpLabelClassifier {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, bucket)
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl LabelClassifier for HttpLabelClassifier {
    async fn classify(&self, storage_key: &str) -> Result<Vec<ConfidenceLabel>, ClassifierError> {
        let request = DetectLabelsRequest {
            bucket: &self.bucket,
            key: storage_key,
            max_labels: MAX_LABELS,
        };

        let res = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body: DetectLabelsResponse = res
            .json()
            .await
            .map_err(|e| ClassifierError::Decode(e.to_string()))?;

        debug!(key = storage_key, count = body.labels.len(), "classifier returned labels");
        Ok(ConfidenceLabel::normalize(body.labels))
    }
}
