use serde::{Deserialize, Serialize};

/// Upper bound on labels kept per product image.
pub const MAX_LABELS: usize = 10;

/// A machine-generated image label with its confidence (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceLabel {
    pub name: String,
    pub confidence: f64,
}

impl ConfidenceLabel {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && (0.0..=100.0).contains(&self.confidence)
    }

    /// Keep classifier output that fits the label invariants, in order, capped
    /// at [`MAX_LABELS`].
    pub fn normalize(labels: Vec<ConfidenceLabel>) -> Vec<ConfidenceLabel> {
        labels
            .into_iter()
            .filter(ConfidenceLabel::is_valid)
            .take(MAX_LABELS)
            .collect()
    }
}
