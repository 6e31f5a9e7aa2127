//! Catalog workflow: validation, existence checks, repository mutation,
//! enrichment scheduling and image URL resolution.
//!
//! Every repository call runs under the configured deadline; when it elapses
//! the call's future is dropped and the request fails as an upstream error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use catalog_core::{CatalogError, CatalogResult, CategoryId, ProductId, ValidationError};
use catalog_products::{Category, ImageResolver, ImageUrlMode, Product, ProductDraft, validate_fields};

use crate::enrichment::{EnrichmentJob, EnrichmentSink};
use crate::repository::{CatalogRepository, RepositoryError, RepositoryResult, StockGuard};

/// Largest number of product ids accepted by one batch lookup.
pub const MAX_BATCH_GET_ITEM: usize = 100;

/// What an inventory delta may do to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventoryPolicy {
    /// Apply every delta, even one that leaves stock negative.
    #[default]
    AllowNegative,
    /// Reject a delta that would leave stock negative.
    RejectNegative,
}

impl InventoryPolicy {
    fn guard(self) -> StockGuard {
        match self {
            InventoryPolicy::AllowNegative => StockGuard::Unchecked,
            InventoryPolicy::RejectNegative => StockGuard::NonNegative,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub call_timeout: Duration,
    pub inventory_policy: InventoryPolicy,
    pub max_batch_ids: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            inventory_policy: InventoryPolicy::default(),
            max_batch_ids: MAX_BATCH_GET_ITEM,
        }
    }
}

/// Result of a product lookup by one or more ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductSelection {
    Single(Product),
    Batch(Vec<Product>),
}

pub struct CatalogWorkflow {
    repo: Arc<dyn CatalogRepository>,
    enrichment: Arc<dyn EnrichmentSink>,
    images: ImageResolver,
    settings: WorkflowSettings,
}

impl CatalogWorkflow {
    pub fn new(
        repo: Arc<dyn CatalogRepository>,
        enrichment: Arc<dyn EnrichmentSink>,
        images: ImageResolver,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            repo,
            enrichment,
            images,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    // -------------------------
    // Mutations
    // -------------------------

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: ProductDraft, mode: ImageUrlMode) -> CatalogResult<Product> {
        self.validate(&draft).await?;

        let mut product = self.call("insert_product", self.repo.insert_product(draft)).await?;
        info!(product_id = %product.id, "product created");

        self.enrich(&product);
        self.images.resolve(&mut product, mode);
        Ok(product)
    }

    #[instrument(skip(self, id, draft), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: &ProductId,
        draft: ProductDraft,
        mode: ImageUrlMode,
    ) -> CatalogResult<Product> {
        self.validate(&draft).await?;
        self.require_product(id).await?;

        let expected = draft.expected_revision();
        let mut product = self
            .call("replace_product", self.repo.replace_product(id, draft, expected))
            .await?;
        info!(product_id = %product.id, revision = product.revision, "product updated");

        self.enrich(&product);
        self.images.resolve(&mut product, mode);
        Ok(product)
    }

    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn adjust_inventory(
        &self,
        id: &ProductId,
        delta: i64,
        mode: ImageUrlMode,
    ) -> CatalogResult<Product> {
        self.require_product(id).await?;

        let guard = self.settings.inventory_policy.guard();
        let mut product = self
            .call("increment_stock", self.repo.increment_stock(id, delta, guard))
            .await?;

        if product.current_stock < 0 {
            warn!(product_id = %id, stock = product.current_stock, "stock is negative after delta");
        } else {
            debug!(product_id = %id, stock = product.current_stock, "stock adjusted");
        }

        self.images.resolve(&mut product, mode);
        Ok(product)
    }

    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn delete(&self, id: &ProductId) -> CatalogResult<()> {
        self.require_product(id).await?;
        self.call("delete_product", self.repo.delete_product(id)).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    // -------------------------
    // Reads
    // -------------------------

    pub async fn list_products(&self, mode: ImageUrlMode) -> CatalogResult<Vec<Product>> {
        let mut products = self.call("list_products", self.repo.list_products()).await?;
        self.images.resolve_all(&mut products, mode);
        Ok(products)
    }

    /// One id returns that product (or `NotFound`); several return the subset
    /// that exists, once per distinct id. The shape follows how many ids were
    /// asked for, so `a,a` is still a batch.
    pub async fn show_products(&self, ids: &[ProductId], mode: ImageUrlMode) -> CatalogResult<ProductSelection> {
        if ids.len() > self.settings.max_batch_ids {
            return Err(CatalogError::TooManyIds {
                max: self.settings.max_batch_ids,
            });
        }

        match ids {
            [id] => {
                let mut product = self.require_product(id).await?;
                self.images.resolve(&mut product, mode);
                Ok(ProductSelection::Single(product))
            }
            _ => {
                let mut distinct: Vec<ProductId> = Vec::with_capacity(ids.len());
                for id in ids.iter().filter(|id| !id.is_empty()) {
                    if !distinct.contains(id) {
                        distinct.push(id.clone());
                    }
                }
                let mut products = self
                    .call("find_products", self.repo.find_products(&distinct))
                    .await?;
                self.images.resolve_all(&mut products, mode);
                Ok(ProductSelection::Batch(products))
            }
        }
    }

    pub async fn products_in_category(&self, category: &str, mode: ImageUrlMode) -> CatalogResult<Vec<Product>> {
        let mut products = self
            .call("find_products_by_category", self.repo.find_products_by_category(category))
            .await?;
        self.images.resolve_all(&mut products, mode);
        Ok(products)
    }

    pub async fn featured_products(&self, mode: ImageUrlMode) -> CatalogResult<Vec<Product>> {
        let mut products = self
            .call("find_featured_products", self.repo.find_featured_products())
            .await?;
        self.images.resolve_all(&mut products, mode);
        Ok(products)
    }

    pub async fn list_categories(&self, mode: ImageUrlMode) -> CatalogResult<Vec<Category>> {
        let mut categories = self.call("list_categories", self.repo.list_categories()).await?;
        self.images.resolve_all(&mut categories, mode);
        Ok(categories)
    }

    pub async fn show_category(&self, id: &CategoryId, mode: ImageUrlMode) -> CatalogResult<Category> {
        let mut category = self
            .call("find_category", self.repo.find_category(id))
            .await?
            .ok_or_else(CatalogError::category_not_found)?;
        self.images.resolve(&mut category, mode);
        Ok(category)
    }

    // -------------------------
    // Internals
    // -------------------------

    /// Field rules first, then the category lookup.
    async fn validate(&self, draft: &ProductDraft) -> CatalogResult<()> {
        validate_fields(draft)?;

        if !draft.category.is_empty() {
            let matches = self
                .call("find_categories_by_name", self.repo.find_categories_by_name(&draft.category))
                .await?;
            if matches.is_empty() {
                return Err(ValidationError::UnknownCategory.into());
            }
        }
        Ok(())
    }

    async fn require_product(&self, id: &ProductId) -> CatalogResult<Product> {
        self.call("find_product", self.repo.find_product(id))
            .await?
            .ok_or_else(CatalogError::product_not_found)
    }

    /// Schedule label enrichment for a freshly written product. Never fails.
    fn enrich(&self, product: &Product) {
        if !self.images.has_own_image(&product.image) {
            debug!(product_id = %product.id, "no product image; enrichment skipped");
            return;
        }
        self.enrichment.submit(EnrichmentJob {
            product_id: product.id.clone(),
            storage_key: product.storage_key(),
        });
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> CatalogResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        match tokio::time::timeout(self.settings.call_timeout, fut).await {
            Ok(result) => result.map_err(|e| repository_error_to_catalog(operation, e)),
            Err(_) => {
                error!(operation, timeout_ms = self.settings.call_timeout.as_millis() as u64, "repository call timed out");
                Err(CatalogError::upstream(format!("{operation} timed out")))
            }
        }
    }
}

fn repository_error_to_catalog(operation: &'static str, err: RepositoryError) -> CatalogError {
    match err {
        // The record vanished between the existence check and the write.
        RepositoryError::NotFound => CatalogError::product_not_found(),
        RepositoryError::Conflict { expected, actual } => CatalogError::conflict(format!(
            "product revision is {actual}, update expected {expected}"
        )),
        RepositoryError::StockUnderflow { .. } => ValidationError::NegativeStock.into(),
        RepositoryError::Backend(msg) => {
            error!(operation, error = %msg, "repository call failed");
            CatalogError::upstream(msg)
        }
    }
}
