//! Stored catalog records.

use std::fmt;

/// A record the repository keeps under its own id.
pub trait Entity {
    type Id: Clone + Ord + fmt::Debug + AsRef<str>;

    fn id(&self) -> &Self::Id;

    /// Whether this is a record read back from the store rather than a
    /// zero-value placeholder. Only stored records carry an id.
    fn is_initialized(&self) -> bool {
        !self.id().as_ref().is_empty()
    }
}
