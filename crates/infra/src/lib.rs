//! Infrastructure layer: storage, the labeling client, background enrichment,
//! configuration, and the catalog workflow that ties them together.

pub mod config;
pub mod enrichment;
pub mod labeling;
pub mod repository;
pub mod seed;
pub mod workflow;

pub use config::{CatalogConfig, ConfigError};
pub use enrichment::{
    DisabledEnrichment, EnrichmentHandle, EnrichmentJob, EnrichmentQueue, EnrichmentSink,
    EnrichmentWorker,
};
pub use labeling::{ClassifierError, HttpLabelClassifier, InMemoryLabelClassifier, LabelClassifier};
pub use repository::{
    CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository, RepositoryError,
    RepositoryResult, StockGuard,
};
pub use seed::{CatalogSeed, SeedError};
pub use workflow::{MAX_BATCH_GET_ITEM, CatalogWorkflow, InventoryPolicy, ProductSelection, WorkflowSettings};
