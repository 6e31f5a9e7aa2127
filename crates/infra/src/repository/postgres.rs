//! Postgres-backed catalog repository.
//!
//! Table names come from configuration. Inventory deltas run as a single
//! `UPDATE ... SET current_stock = current_stock + $2` so concurrent deltas
//! never lose updates; conditional replaces compare the `revision` column in
//! the same statement.
//!
//! ## Error Mapping
//!
//! | Situation | RepositoryError |
//! |-----------|-----------------|
//! | `UPDATE`/`DELETE` matched no row and the id is absent | `NotFound` |
//! | conditional replace matched no row but the id exists | `Conflict` |
//! | guarded increment matched no row but the id exists | `StockUnderflow` |
//! | any SQLx failure | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use catalog_core::{CategoryId, ExpectedRevision, ProductId};
use catalog_products::{Category, ConfidenceLabel, Product, ProductDraft};

use super::{CatalogRepository, RepositoryError, RepositoryResult, StockGuard};

const PRODUCT_COLUMNS: &str = "id, url, sku, name, category, style, description, price, image, \
     featured, gender_affinity, current_stock, promoted, image_labels, revision";

const CATEGORY_COLUMNS: &str = "id, url, name, image";

/// Postgres-backed catalog.
///
/// `Send + Sync`; all statements go through the shared SQLx pool.
pub struct PostgresCatalogRepository {
    pool: Arc<PgPool>,
    products_table: String,
    categories_table: String,
}

impl PostgresCatalogRepository {
    pub fn new(
        pool: PgPool,
        products_table: impl Into<String>,
        categories_table: impl Into<String>,
    ) -> Self {
        Self {
            pool: Arc::new(pool),
            products_table: products_table.into(),
            categories_table: categories_table.into(),
        }
    }

    /// Create the catalog tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        let products = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL DEFAULT '',
                sku TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT '',
                style TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                price DOUBLE PRECISION NOT NULL DEFAULT 0,
                image TEXT NOT NULL DEFAULT '',
                featured BOOLEAN NOT NULL DEFAULT FALSE,
                gender_affinity TEXT NOT NULL DEFAULT '',
                current_stock BIGINT NOT NULL DEFAULT 0,
                promoted BOOLEAN NOT NULL DEFAULT FALSE,
                image_labels JSONB,
                revision BIGINT NOT NULL DEFAULT 1
            )
            "#,
            self.products_table
        );
        let categories = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL UNIQUE,
                image TEXT NOT NULL DEFAULT ''
            )
            "#,
            self.categories_table
        );

        for statement in [products, categories] {
            sqlx::query(&statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn fetch_products(&self, operation: &str, sql: &str) -> RepositoryResult<Vec<Product>> {
        let rows = sqlx::query(sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter().map(|r| product_from_row(operation, r)).collect()
    }

    async fn current_row_state(&self, id: &ProductId) -> RepositoryResult<Option<(u64, i64)>> {
        let sql = format!(
            "SELECT revision, current_stock FROM {} WHERE id = $1",
            self.products_table
        );
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("current_row_state", e))?;

        row.map(|r| {
            let revision: i64 = r.try_get("revision").map_err(|e| map_sqlx_error("current_row_state", e))?;
            let stock: i64 = r
                .try_get("current_stock")
                .map_err(|e| map_sqlx_error("current_row_state", e))?;
            Ok((revision as u64, stock))
        })
        .transpose()
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    #[instrument(skip(self))]
    async fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM {} ORDER BY id", self.products_table);
        self.fetch_products("list_products", &sql).await
    }

    #[instrument(skip(self, id), fields(product_id = %id))]
    async fn find_product(&self, id: &ProductId) -> RepositoryResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM {} WHERE id = $1", self.products_table);
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;
        row.map(|r| product_from_row("find_product", &r)).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_products(&self, ids: &[ProductId]) -> RepositoryResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE id = ANY($1)",
            self.products_table
        );
        let keys: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let rows = sqlx::query(&sql)
            .bind(keys)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_products", e))?;

        let mut found = rows
            .iter()
            .map(|r| product_from_row("find_products", r))
            .collect::<RepositoryResult<Vec<_>>>()?;
        found.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn find_products_by_category(&self, category: &str) -> RepositoryResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE category = $1 ORDER BY id",
            self.products_table
        );
        let rows = sqlx::query(&sql)
            .bind(category)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_products_by_category", e))?;
        rows.iter()
            .map(|r| product_from_row("find_products_by_category", r))
            .collect()
    }

    #[instrument(skip(self))]
    async fn find_featured_products(&self) -> RepositoryResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE featured ORDER BY id",
            self.products_table
        );
        self.fetch_products("find_featured_products", &sql).await
    }

    #[instrument(skip(self, draft))]
    async fn insert_product(&self, draft: ProductDraft) -> RepositoryResult<Product> {
        let product = Product::from_draft(ProductId::generate(), draft);
        let sql = format!(
            r#"
            INSERT INTO {} (
                id, url, sku, name, category, style, description, price, image,
                featured, gender_affinity, current_stock, promoted, image_labels, revision
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NULL, $14)
            "#,
            self.products_table
        );
        sqlx::query(&sql)
            .bind(product.id.as_str())
            .bind(&product.url)
            .bind(&product.sku)
            .bind(&product.name)
            .bind(&product.category)
            .bind(&product.style)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.image)
            .bind(product.featured)
            .bind(&product.gender_affinity)
            .bind(product.current_stock)
            .bind(product.promoted)
            .bind(product.revision as i64)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(product)
    }

    #[instrument(skip(self, id, draft), fields(product_id = %id))]
    async fn replace_product(
        &self,
        id: &ProductId,
        draft: ProductDraft,
        expected: ExpectedRevision,
    ) -> RepositoryResult<Product> {
        let expected_param: Option<i64> = match expected {
            ExpectedRevision::Any => None,
            ExpectedRevision::Exact(v) => Some(v as i64),
        };
        let sql = format!(
            r#"
            UPDATE {} SET
                url = $2, sku = $3, name = $4, category = $5, style = $6,
                description = $7, price = $8, image = $9, featured = $10,
                gender_affinity = $11, current_stock = $12, promoted = $13,
                revision = revision + 1
            WHERE id = $1 AND ($14::bigint IS NULL OR revision = $14)
            RETURNING {PRODUCT_COLUMNS}
            "#,
            self.products_table
        );
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(&draft.url)
            .bind(&draft.sku)
            .bind(&draft.name)
            .bind(&draft.category)
            .bind(&draft.style)
            .bind(&draft.description)
            .bind(draft.price)
            .bind(&draft.image)
            .bind(draft.featured)
            .bind(&draft.gender_affinity)
            .bind(draft.current_stock)
            .bind(draft.promoted)
            .bind(expected_param)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("replace_product", e))?;

        if let Some(row) = row {
            return product_from_row("replace_product", &row);
        }

        match (self.current_row_state(id).await?, expected) {
            (Some((actual, _)), ExpectedRevision::Exact(expected)) => {
                Err(RepositoryError::Conflict { expected, actual })
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    #[instrument(skip(self, id), fields(product_id = %id))]
    async fn increment_stock(
        &self,
        id: &ProductId,
        delta: i64,
        guard: StockGuard,
    ) -> RepositoryResult<Product> {
        let guard_clause = match guard {
            StockGuard::Unchecked => "",
            StockGuard::NonNegative => "AND current_stock + $2 >= 0",
        };
        let sql = format!(
            r#"
            UPDATE {} SET
                current_stock = current_stock + $2,
                revision = revision + 1
            WHERE id = $1 {guard_clause}
            RETURNING {PRODUCT_COLUMNS}
            "#,
            self.products_table
        );
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(delta)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("increment_stock", e))?;

        if let Some(row) = row {
            return product_from_row("increment_stock", &row);
        }

        match self.current_row_state(id).await? {
            Some((_, current)) => Err(RepositoryError::StockUnderflow { current, delta }),
            None => Err(RepositoryError::NotFound),
        }
    }

    #[instrument(skip(self, id, labels), fields(product_id = %id, count = labels.len()))]
    async fn replace_labels(&self, id: &ProductId, labels: Vec<ConfidenceLabel>) -> RepositoryResult<()> {
        let sql = format!("UPDATE {} SET image_labels = $2 WHERE id = $1", self.products_table);
        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(Json(labels))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("replace_labels", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, id), fields(product_id = %id))]
    async fn delete_product(&self, id: &ProductId) -> RepositoryResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.products_table);
        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM {} ORDER BY id", self.categories_table);
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(|r| category_from_row("list_categories", r)).collect()
    }

    #[instrument(skip(self, id), fields(category_id = %id))]
    async fn find_category(&self, id: &CategoryId) -> RepositoryResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM {} WHERE id = $1", self.categories_table);
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_category", e))?;
        row.map(|r| category_from_row("find_category", &r)).transpose()
    }

    #[instrument(skip(self))]
    async fn find_categories_by_name(&self, name: &str) -> RepositoryResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM {} WHERE name = $1", self.categories_table);
        let rows = sqlx::query(&sql)
            .bind(name)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_categories_by_name", e))?;
        rows.iter()
            .map(|r| category_from_row("find_categories_by_name", r))
            .collect()
    }
}

fn product_from_row(operation: &str, row: &PgRow) -> RepositoryResult<Product> {
    let get = |e: sqlx::Error| map_sqlx_error(operation, e);
    let labels: Option<Json<Vec<ConfidenceLabel>>> = row.try_get("image_labels").map_err(get)?;
    let revision: i64 = row.try_get("revision").map_err(get)?;
    let id: String = row.try_get("id").map_err(get)?;

    Ok(Product {
        id: ProductId::from(id),
        url: row.try_get("url").map_err(get)?,
        sku: row.try_get("sku").map_err(get)?,
        name: row.try_get("name").map_err(get)?,
        category: row.try_get("category").map_err(get)?,
        style: row.try_get("style").map_err(get)?,
        description: row.try_get("description").map_err(get)?,
        price: row.try_get("price").map_err(get)?,
        image: row.try_get("image").map_err(get)?,
        featured: row.try_get("featured").map_err(get)?,
        gender_affinity: row.try_get("gender_affinity").map_err(get)?,
        current_stock: row.try_get("current_stock").map_err(get)?,
        promoted: row.try_get("promoted").map_err(get)?,
        image_labels: labels.map(|Json(l)| l),
        revision: revision as u64,
    })
}

fn category_from_row(operation: &str, row: &PgRow) -> RepositoryResult<Category> {
    let get = |e: sqlx::Error| map_sqlx_error(operation, e);
    let id: String = row.try_get("id").map_err(get)?;
    Ok(Category {
        id: CategoryId::from(id),
        url: row.try_get("url").map_err(get)?,
        name: row.try_get("name").map_err(get)?,
        image: row.try_get("image").map_err(get)?,
    })
}

/// Map SQLx errors to repository errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            RepositoryError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            RepositoryError::Backend(format!("connection pool timed out in {}", operation))
        }
        _ => RepositoryError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
