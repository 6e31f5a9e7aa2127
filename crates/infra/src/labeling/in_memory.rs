use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use catalog_products::ConfidenceLabel;

use super::{ClassifierError, LabelClassifier};

/// In-memory classifier for tests/dev.
///
/// Answers from per-key fixtures, falling back to a default label set when one
/// is configured. `fail_next(n)` makes the next `n` calls fail, which is how
/// retry behaviour is exercised without a network.
#[derive(Debug, Default)]
pub struct InMemoryLabelClassifier {
    fixtures: RwLock<HashMap<String, Vec<ConfidenceLabel>>>,
    fallback: Option<Vec<ConfidenceLabel>>,
    pending_failures: AtomicUsize,
    calls: AtomicUsize,
}

impl InMemoryLabelClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, labels: Vec<ConfidenceLabel>) -> Self {
        self.fallback = Some(labels);
        self
    }

    pub fn insert(&self, storage_key: impl Into<String>, labels: Vec<ConfidenceLabel>) {
        if let Ok(mut map) = self.fixtures.write() {
            map.insert(storage_key.into(), labels);
        }
    }

    pub fn fail_next(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Number of classify calls seen so far (including failed ones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LabelClassifier for InMemoryLabelClassifier {
    async fn classify(&self, storage_key: &str) -> Result<Vec<ConfidenceLabel>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ClassifierError::Unavailable("injected failure".to_string()));
        }

        let fixture = self
            .fixtures
            .read()
            .map_err(|_| ClassifierError::Unavailable("fixture lock poisoned".to_string()))?
            .get(storage_key)
            .cloned();

        match fixture.or_else(|| self.fallback.clone()) {
            Some(labels) => Ok(ConfidenceLabel::normalize(labels)),
            None => Err(ClassifierError::Unavailable(format!("no labels for {storage_key}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_from_fixture_then_fallback() {
        let classifier = InMemoryLabelClassifier::new().with_fallback(vec![ConfidenceLabel::new("Thing", 50.0)]);
        classifier.insert("images/a/b.png", vec![ConfidenceLabel::new("Boot", 99.0)]);

        let labels = classifier.classify("images/a/b.png").await.unwrap();
        assert_eq!(labels[0].name, "Boot");

        let labels = classifier.classify("images/x/y.png").await.unwrap();
        assert_eq!(labels[0].name, "Thing");
    }

    #[tokio::test]
    async fn unknown_key_without_fallback_fails() {
        let classifier = InMemoryLabelClassifier::new();
        assert!(matches!(
            classifier.classify("images/a/b.png").await,
            Err(ClassifierError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let classifier = InMemoryLabelClassifier::new().with_fallback(vec![ConfidenceLabel::new("Thing", 50.0)]);
        classifier.fail_next(2);

        assert!(classifier.classify("k").await.is_err());
        assert!(classifier.classify("k").await.is_err());
        assert!(classifier.classify("k").await.is_ok());
        assert_eq!(classifier.calls(), 3);
    }
}
