//! Products domain module.
//!
//! This crate contains the catalog records and the business rules applied to
//! them, implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod category;
pub mod image;
pub mod label;
pub mod product;
pub mod validation;

pub use category::Category;
pub use image::{BoolParam, ImageResolver, ImageScoped, ImageUrlMode, PLACEHOLDER_IMAGE};
pub use label::{ConfidenceLabel, MAX_LABELS};
pub use product::{InventoryDelta, Product, ProductDraft};
pub use validation::validate_fields;
