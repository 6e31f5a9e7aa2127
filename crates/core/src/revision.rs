//! Optimistic concurrency for catalog records.

/// Revision expectation attached to a conditional write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip revision checking (last write wins).
    Any,
    /// Require the stored record to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(v) => v == actual,
        }
    }
}

impl From<Option<u64>> for ExpectedRevision {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(v) => ExpectedRevision::Exact(v),
            None => ExpectedRevision::Any,
        }
    }
}
