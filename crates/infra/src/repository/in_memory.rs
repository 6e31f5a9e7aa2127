use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use catalog_core::{CategoryId, Entity, ExpectedRevision, ProductId};
use catalog_products::{Category, ConfidenceLabel, Product, ProductDraft};

use super::{CatalogRepository, RepositoryError, RepositoryResult, StockGuard};

fn poisoned() -> RepositoryError {
    RepositoryError::Backend("in-memory table lock poisoned".to_string())
}

/// In-memory entity table for tests/dev, keyed by entity id.
///
/// Listing order is the id order, which for generated (UUIDv7) ids is creation
/// order.
#[derive(Debug)]
pub struct InMemoryTable<V: Entity> {
    inner: RwLock<BTreeMap<V::Id, V>>,
}

impl<V: Entity> InMemoryTable<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<V: Entity> Default for InMemoryTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Entity + Clone> InMemoryTable<V> {
    pub fn get(&self, key: &V::Id) -> RepositoryResult<Option<V>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    pub fn upsert(&self, value: V) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(value.id().clone(), value);
        Ok(())
    }

    pub fn list_where(&self, keep: impl Fn(&V) -> bool) -> RepositoryResult<Vec<V>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().filter(|v| keep(v)).cloned().collect())
    }

    pub fn remove(&self, key: &V::Id) -> RepositoryResult<V> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(key).ok_or(RepositoryError::NotFound)
    }

    /// Read-modify-write of one record under the table's write lock.
    ///
    /// Concurrent calls on the same key are serialized, so `f` sees every
    /// earlier update.
    pub fn update_with<R>(
        &self,
        key: &V::Id,
        f: impl FnOnce(&mut V) -> RepositoryResult<R>,
    ) -> RepositoryResult<R> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let value = map.get_mut(key).ok_or(RepositoryError::NotFound)?;
        f(value)
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    products: InMemoryTable<Product>,
    categories: InMemoryTable<Category>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a product exactly as given (seed data keeps its own ids).
    pub fn put_product(&self, mut product: Product) -> RepositoryResult<()> {
        if product.revision == 0 {
            product.revision = 1;
        }
        self.products.upsert(product)
    }

    pub fn put_category(&self, category: Category) -> RepositoryResult<()> {
        self.categories.upsert(category)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        self.products.list_where(|_| true)
    }

    async fn find_product(&self, id: &ProductId) -> RepositoryResult<Option<Product>> {
        self.products.get(id)
    }

    async fn find_products(&self, ids: &[ProductId]) -> RepositoryResult<Vec<Product>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.products.get(id)? {
                found.push(p);
            }
        }
        Ok(found)
    }

    async fn find_products_by_category(&self, category: &str) -> RepositoryResult<Vec<Product>> {
        self.products.list_where(|p| p.category == category)
    }

    async fn find_featured_products(&self) -> RepositoryResult<Vec<Product>> {
        self.products.list_where(|p| p.featured)
    }

    async fn insert_product(&self, draft: ProductDraft) -> RepositoryResult<Product> {
        let product = Product::from_draft(ProductId::generate(), draft);
        self.products.upsert(product.clone())?;
        Ok(product)
    }

    async fn replace_product(
        &self,
        id: &ProductId,
        draft: ProductDraft,
        expected: ExpectedRevision,
    ) -> RepositoryResult<Product> {
        self.products.update_with(id, |product| {
            if !expected.matches(product.revision) {
                let expected = match expected {
                    ExpectedRevision::Exact(v) => v,
                    ExpectedRevision::Any => product.revision,
                };
                return Err(RepositoryError::Conflict {
                    expected,
                    actual: product.revision,
                });
            }
            product.replace_fields(draft);
            product.revision += 1;
            Ok(product.clone())
        })
    }

    async fn increment_stock(
        &self,
        id: &ProductId,
        delta: i64,
        guard: StockGuard,
    ) -> RepositoryResult<Product> {
        self.products.update_with(id, |product| {
            let Some(next) = product.current_stock.checked_add(delta) else {
                return Err(RepositoryError::Backend(format!(
                    "stock overflow applying {delta} to {}",
                    product.current_stock
                )));
            };
            if !guard.permits(product.current_stock, delta) {
                return Err(RepositoryError::StockUnderflow {
                    current: product.current_stock,
                    delta,
                });
            }
            product.current_stock = next;
            product.revision += 1;
            Ok(product.clone())
        })
    }

    async fn replace_labels(&self, id: &ProductId, labels: Vec<ConfidenceLabel>) -> RepositoryResult<()> {
        self.products.update_with(id, |product| {
            product.replace_labels(labels);
            Ok(())
        })
    }

    async fn delete_product(&self, id: &ProductId) -> RepositoryResult<()> {
        self.products.remove(id).map(|_| ())
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        self.categories.list_where(|_| true)
    }

    async fn find_category(&self, id: &CategoryId) -> RepositoryResult<Option<Category>> {
        self.categories.get(id)
    }

    async fn find_categories_by_name(&self, name: &str) -> RepositoryResult<Vec<Category>> {
        self.categories.list_where(|c| c.name == name)
    }
}
