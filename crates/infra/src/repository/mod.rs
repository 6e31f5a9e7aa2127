//! Catalog storage abstraction (the Repository Client).
//!
//! Lookups return `Option`/`Vec` so "not there" is an ordinary value; errors are
//! reserved for writes that could not be applied and backend failures.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryCatalogRepository, InMemoryTable};
pub use postgres::PostgresCatalogRepository;

use async_trait::async_trait;
use thiserror::Error;

use catalog_core::{CategoryId, ExpectedRevision, ProductId};
use catalog_products::{Category, ConfidenceLabel, Product, ProductDraft};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("revision mismatch: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("stock would drop below zero (current {current}, delta {delta})")]
    StockUnderflow { current: i64, delta: i64 },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// How an inventory increment treats a result below zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockGuard {
    /// Apply the delta whatever the result.
    Unchecked,
    /// Refuse, atomically, any delta that would leave stock negative.
    NonNegative,
}

impl StockGuard {
    pub fn permits(self, current: i64, delta: i64) -> bool {
        match self {
            StockGuard::Unchecked => true,
            StockGuard::NonNegative => matches!(current.checked_add(delta), Some(next) if next >= 0),
        }
    }
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_products(&self) -> RepositoryResult<Vec<Product>>;

    async fn find_product(&self, id: &ProductId) -> RepositoryResult<Option<Product>>;

    /// Batch lookup. Missing ids are skipped; order follows `ids`.
    async fn find_products(&self, ids: &[ProductId]) -> RepositoryResult<Vec<Product>>;

    async fn find_products_by_category(&self, category: &str) -> RepositoryResult<Vec<Product>>;

    async fn find_featured_products(&self) -> RepositoryResult<Vec<Product>>;

    /// Store a new product under a repository-assigned id at revision 1.
    async fn insert_product(&self, draft: ProductDraft) -> RepositoryResult<Product>;

    /// Replace the mutable fields, conditionally on `expected`, bumping the revision.
    async fn replace_product(
        &self,
        id: &ProductId,
        draft: ProductDraft,
        expected: ExpectedRevision,
    ) -> RepositoryResult<Product>;

    /// Atomically add `delta` to the current stock and return the new record.
    async fn increment_stock(
        &self,
        id: &ProductId,
        delta: i64,
        guard: StockGuard,
    ) -> RepositoryResult<Product>;

    /// Overwrite `image_labels` only. Leaves every other field and the revision alone.
    async fn replace_labels(&self, id: &ProductId, labels: Vec<ConfidenceLabel>) -> RepositoryResult<()>;

    async fn delete_product(&self, id: &ProductId) -> RepositoryResult<()>;

    async fn list_categories(&self) -> RepositoryResult<Vec<Category>>;

    async fn find_category(&self, id: &CategoryId) -> RepositoryResult<Option<Category>>;

    async fn find_categories_by_name(&self, name: &str) -> RepositoryResult<Vec<Category>>;
}
