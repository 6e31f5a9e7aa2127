//! Shared catalog building blocks.
//!
//! Identifiers, the entity trait, revision expectations and the error taxonomy
//! used by every other crate (no IO, no HTTP, no storage).

pub mod entity;
pub mod error;
pub mod id;
pub mod revision;

pub use entity::Entity;
pub use error::{CatalogError, CatalogResult, ValidationError};
pub use id::{CategoryId, ProductId};
pub use revision::ExpectedRevision;
