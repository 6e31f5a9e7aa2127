//! Infrastructure wiring: repository, classifier, enrichment worker, workflow.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::{info, warn};

use catalog_infra::{
    CatalogConfig, CatalogRepository, CatalogSeed, CatalogWorkflow, DisabledEnrichment, EnrichmentHandle,
    EnrichmentSink, HttpLabelClassifier, InMemoryCatalogRepository, PostgresCatalogRepository, RepositoryError, SeedError,
};
use catalog_products::ImageResolver;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to the database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to prepare the catalog schema: {0}")]
    Schema(#[from] RepositoryError),

    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// Shared request-handling state.
pub struct AppServices {
    pub workflow: CatalogWorkflow,
}

impl AppServices {
    pub fn new(
        config: &CatalogConfig,
        repo: Arc<dyn CatalogRepository>,
        enrichment: Arc<dyn EnrichmentSink>,
    ) -> Self {
        let workflow = CatalogWorkflow::new(
            repo,
            enrichment,
            ImageResolver::new(config.image_root_url.clone()),
            config.workflow_settings(),
        );
        Self { workflow }
    }
}

/// Tasks that outlive a single request and must be stopped on shutdown.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    enrichment: Option<EnrichmentHandle>,
}

impl BackgroundTasks {
    pub fn new(enrichment: Option<EnrichmentHandle>) -> Self {
        Self { enrichment }
    }

    pub async fn shutdown(self) {
        if let Some(handle) = self.enrichment {
            handle.shutdown().await;
            info!("enrichment worker stopped");
        }
    }
}

pub async fn build_services(config: &CatalogConfig) -> Result<(AppServices, BackgroundTasks), StartupError> {
    let repo = build_repository(config).await?;

    let (enrichment, background): (Arc<dyn EnrichmentSink>, _) = match &config.labels_endpoint {
        Some(endpoint) => {
            let classifier = Arc::new(HttpLabelClassifier::new(endpoint.clone(), config.image_bucket.clone()));
            let (queue, handle) = config.enrichment_worker().spawn(repo.clone(), classifier);
            info!(endpoint = %endpoint, "label enrichment enabled");
            (Arc::new(queue), BackgroundTasks::new(Some(handle)))
        }
        None => {
            warn!("LABELS_ENDPOINT not set; label enrichment disabled");
            (Arc::new(DisabledEnrichment), BackgroundTasks::default())
        }
    };

    Ok((AppServices::new(config, repo, enrichment), background))
}

async fn build_repository(config: &CatalogConfig) -> Result<Arc<dyn CatalogRepository>, StartupError> {
    if let Some(url) = &config.database_url {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        let repo = PostgresCatalogRepository::new(
            pool,
            config.products_table.clone(),
            config.categories_table.clone(),
        );
        repo.ensure_schema().await?;
        info!(
            products = %config.products_table,
            categories = %config.categories_table,
            "using Postgres catalog repository"
        );
        return Ok(Arc::new(repo));
    }

    let repo = InMemoryCatalogRepository::new();
    match &config.seed_file {
        Some(path) => CatalogSeed::from_file(path)?.apply(&repo)?,
        None => warn!("DATABASE_URL not set; using an empty in-memory catalog"),
    }
    Ok(Arc::new(repo))
}
