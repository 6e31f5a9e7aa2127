//! Field-level product rules.
//!
//! The category rule needs a repository lookup and is applied by the workflow
//! right after these, which keeps the overall rule order: name, price, stock,
//! category.

use catalog_core::ValidationError;

use crate::product::ProductDraft;

/// Check name, price and stock, in that order. First failure wins.
pub fn validate_fields(draft: &ProductDraft) -> Result<(), ValidationError> {
    if draft.name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    // Written as a negated `>=` so NaN is rejected too.
    if !(draft.price >= 0.0) {
        return Err(ValidationError::NegativePrice);
    }

    if draft.current_stock < 0 {
        return Err(ValidationError::NegativeStock);
    }

    Ok(())
}
