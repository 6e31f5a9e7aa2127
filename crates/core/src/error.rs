//! Catalog error model.

use thiserror::Error;

/// Result type used across the catalog workflow.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Business-rule violation on a product candidate.
///
/// Rules are checked in a fixed order and the first failure wins, so a
/// candidate only ever reports one of these.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Product name is required")]
    EmptyName,

    #[error("Product price cannot be a negative value")]
    NegativePrice,

    #[error("Product current stock cannot be a negative value")]
    NegativeStock,

    #[error("Invalid product category; does not exist")]
    UnknownCategory,
}

/// Catalog-level error, translated into an HTTP status at the API boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A product candidate broke a business rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request body could not be decoded.
    #[error("invalid request payload: {0}")]
    Payload(String),

    /// A batch lookup asked for more ids than the store accepts per call.
    #[error("Maximum number of product IDs per request is {max}")]
    TooManyIds { max: usize },

    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A conditional write lost against a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The repository (or another downstream dependency) failed or timed out.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl CatalogError {
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn product_not_found() -> Self {
        Self::NotFound("Product")
    }

    pub fn category_not_found() -> Self {
        Self::NotFound("Category")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_client_facing() {
        let err: CatalogError = ValidationError::EmptyName.into();
        assert_eq!(err.to_string(), "Product name is required");
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(CatalogError::product_not_found().to_string(), "Product not found");
        assert_eq!(CatalogError::category_not_found().to_string(), "Category not found");
    }

    #[test]
    fn too_many_ids_reports_the_limit() {
        let err = CatalogError::TooManyIds { max: 100 };
        assert_eq!(err.to_string(), "Maximum number of product IDs per request is 100");
    }
}
