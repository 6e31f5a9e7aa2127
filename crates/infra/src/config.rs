//! Process configuration, read once from the environment at start-up.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::enrichment::EnrichmentWorker;
use crate::workflow::{InventoryPolicy, MAX_BATCH_GET_ITEM, WorkflowSettings};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub bind_addr: SocketAddr,
    pub image_root_url: String,
    pub image_bucket: String,
    pub products_table: String,
    pub categories_table: String,
    pub database_url: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub labels_endpoint: Option<String>,
    pub downstream_timeout: Duration,
    pub request_timeout: Duration,
    pub inventory_policy: InventoryPolicy,
    pub enrichment_max_retries: u32,
    pub enrichment_queue_capacity: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            image_root_url: String::new(),
            image_bucket: String::new(),
            products_table: "products".to_string(),
            categories_table: "categories".to_string(),
            database_url: None,
            seed_file: None,
            labels_endpoint: None,
            downstream_timeout: Duration::from_millis(5_000),
            request_timeout: Duration::from_millis(30_000),
            inventory_policy: InventoryPolicy::AllowNegative,
            enrichment_max_retries: 3,
            enrichment_queue_capacity: 1024,
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or empty optional values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let allow_negative = parse_or("INVENTORY_ALLOW_NEGATIVE", get("INVENTORY_ALLOW_NEGATIVE"), true)?;

        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), defaults.bind_addr)?,
            image_root_url: lookup("IMAGE_ROOT_URL").unwrap_or(defaults.image_root_url),
            image_bucket: lookup("IMAGE_S3_BUCKET").unwrap_or(defaults.image_bucket),
            products_table: get("DDB_TABLE_PRODUCTS").unwrap_or(defaults.products_table),
            categories_table: get("DDB_TABLE_CATEGORIES").unwrap_or(defaults.categories_table),
            database_url: get("DATABASE_URL"),
            seed_file: get("CATALOG_SEED_FILE").map(PathBuf::from),
            labels_endpoint: get("LABELS_ENDPOINT"),
            downstream_timeout: Duration::from_millis(parse_or(
                "DOWNSTREAM_TIMEOUT_MS",
                get("DOWNSTREAM_TIMEOUT_MS"),
                5_000u64,
            )?),
            request_timeout: Duration::from_millis(parse_or(
                "REQUEST_TIMEOUT_MS",
                get("REQUEST_TIMEOUT_MS"),
                30_000u64,
            )?),
            inventory_policy: if allow_negative {
                InventoryPolicy::AllowNegative
            } else {
                InventoryPolicy::RejectNegative
            },
            enrichment_max_retries: parse_or(
                "ENRICHMENT_MAX_RETRIES",
                get("ENRICHMENT_MAX_RETRIES"),
                defaults.enrichment_max_retries,
            )?,
            enrichment_queue_capacity: parse_or(
                "ENRICHMENT_QUEUE_CAPACITY",
                get("ENRICHMENT_QUEUE_CAPACITY"),
                defaults.enrichment_queue_capacity,
            )?,
        })
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            call_timeout: self.downstream_timeout,
            inventory_policy: self.inventory_policy,
            max_batch_ids: MAX_BATCH_GET_ITEM,
        }
    }

    pub fn enrichment_worker(&self) -> EnrichmentWorker {
        EnrichmentWorker {
            queue_capacity: self.enrichment_queue_capacity.max(1),
            max_retries: self.enrichment_max_retries,
            call_timeout: self.downstream_timeout,
            ..EnrichmentWorker::default()
        }
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<CatalogConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        CatalogConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config(&[]).unwrap(), CatalogConfig::default());
    }

    #[test]
    fn values_override_defaults() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("IMAGE_ROOT_URL", "https://cdn.example.com/"),
            ("DDB_TABLE_PRODUCTS", "retail_products"),
            ("LABELS_ENDPOINT", "http://labels.local/detect"),
            ("DOWNSTREAM_TIMEOUT_MS", "250"),
            ("INVENTORY_ALLOW_NEGATIVE", "false"),
            ("ENRICHMENT_MAX_RETRIES", "0"),
        ])
        .unwrap();

        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.image_root_url, "https://cdn.example.com/");
        assert_eq!(cfg.products_table, "retail_products");
        assert_eq!(cfg.categories_table, "categories");
        assert_eq!(cfg.labels_endpoint.as_deref(), Some("http://labels.local/detect"));
        assert_eq!(cfg.downstream_timeout, Duration::from_millis(250));
        assert_eq!(cfg.inventory_policy, InventoryPolicy::RejectNegative);
        assert_eq!(cfg.enrichment_worker().max_retries, 0);
        assert_eq!(cfg.workflow_settings().call_timeout, Duration::from_millis(250));
    }

    #[test]
    fn blank_optional_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("LABELS_ENDPOINT", "")]).unwrap();
        assert!(cfg.database_url.is_none());
        assert!(cfg.labels_endpoint.is_none());
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let err = config(&[("REQUEST_TIMEOUT_MS", "soon")]).unwrap_err();
        let ConfigError::Invalid { key, value, .. } = err;
        assert_eq!(key, "REQUEST_TIMEOUT_MS");
        assert_eq!(value, "soon");
    }
}
