//! Catalog seed data for the in-memory repository.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use catalog_core::Entity;
use catalog_products::{Category, Product};

use crate::repository::{InMemoryCatalogRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("seed record without an id")]
    MissingId,

    #[error("failed to store seed record: {0}")]
    Store(#[from] RepositoryError),
}

/// `{"products": [...], "categories": [...]}`
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl CatalogSeed {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Load every record into `repo`. Records must carry their id.
    pub fn apply(self, repo: &InMemoryCatalogRepository) -> Result<(), SeedError> {
        let (products, categories) = (self.products.len(), self.categories.len());

        for category in self.categories {
            if !category.is_initialized() {
                return Err(SeedError::MissingId);
            }
            repo.put_category(category)?;
        }
        for product in self.products {
            if !product.is_initialized() {
                return Err(SeedError::MissingId);
            }
            repo.put_product(product)?;
        }

        info!(products, categories, "catalog seeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use catalog_core::{CategoryId, ProductId};

    use super::*;
    use crate::repository::CatalogRepository;

    const SEED: &str = r#"{
        "categories": [{"id": "1", "url": "", "name": "footwear", "image": "footwear.jpg"}],
        "products": [{
            "id": "p-1",
            "name": "Trail Boot",
            "category": "footwear",
            "price": 120.5,
            "image": "boot.png",
            "featured": true,
            "currentStock": 7
        }]
    }"#;

    #[tokio::test]
    async fn seed_populates_the_repository() {
        let repo = InMemoryCatalogRepository::new();
        CatalogSeed::from_json(SEED).unwrap().apply(&repo).unwrap();

        let product = repo.find_product(&ProductId::from("p-1")).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 7);
        assert_eq!(product.revision, 1);
        assert!(product.featured);

        let category = repo.find_category(&CategoryId::from("1")).await.unwrap().unwrap();
        assert_eq!(category.name, "footwear");
    }

    #[test]
    fn product_without_id_is_rejected() {
        let repo = InMemoryCatalogRepository::new();
        let seed = CatalogSeed::from_json(r#"{"products": [{"name": "Nameless id"}]}"#).unwrap();
        assert!(matches!(seed.apply(&repo), Err(SeedError::MissingId)));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = CatalogSeed::from_file("/nonexistent/catalog.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/catalog.json"));
    }
}
