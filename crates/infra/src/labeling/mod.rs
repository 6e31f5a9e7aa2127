//! Image classification client (the Label Enricher).

pub mod http;
pub mod in_memory;

pub use http::HttpLabelClassifier;
pub use in_memory::InMemoryLabelClassifier;

use async_trait::async_trait;
use thiserror::Error;

use catalog_products::ConfidenceLabel;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier returned status {0}")]
    Status(u16),

    #[error("classifier response could not be decoded: {0}")]
    Decode(String),

    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

/// Black-box vision classifier.
#[async_trait]
pub trait LabelClassifier: Send + Sync {
    /// Labels for the image stored under `storage_key`, most confident first.
    async fn classify(&self, storage_key: &str) -> Result<Vec<ConfidenceLabel>, ClassifierError>;
}
