//! Background label enrichment.
//!
//! Create/update hand an [`EnrichmentJob`] to an [`EnrichmentSink`] and return
//! right away. The worker classifies the image and writes the labels later, on
//! its own failure channel: classifier and storage errors are logged and
//! retried, never reported to the request that scheduled the job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use catalog_core::ProductId;
use catalog_products::ConfidenceLabel;

use crate::labeling::LabelClassifier;
use crate::repository::{CatalogRepository, RepositoryError};

/// One product image to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentJob {
    pub product_id: ProductId,
    pub storage_key: String,
}

/// Where the workflow hands enrichment jobs.
pub trait EnrichmentSink: Send + Sync + 'static {
    /// Must not block and must not fail the caller.
    fn submit(&self, job: EnrichmentJob);
}

/// Sink used when no classifier is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEnrichment;

impl EnrichmentSink for DisabledEnrichment {
    fn submit(&self, job: EnrichmentJob) {
        debug!(product_id = %job.product_id, "enrichment disabled; job dropped");
    }
}

/// Bounded queue feeding an [`EnrichmentWorker`].
#[derive(Debug, Clone)]
pub struct EnrichmentQueue {
    tx: mpsc::Sender<EnrichmentJob>,
}

impl EnrichmentSink for EnrichmentQueue {
    fn submit(&self, job: EnrichmentJob) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(product_id = %job.product_id, "enrichment queue full; job dropped");
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(product_id = %job.product_id, "enrichment worker stopped; job dropped");
            }
        }
    }
}

/// Config for the enrichment worker.
#[derive(Debug, Clone)]
pub struct EnrichmentWorker {
    pub queue_capacity: usize,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub call_timeout: Duration,
}

impl Default for EnrichmentWorker {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_concurrent: 4,
            max_retries: 3,
            base_backoff: Duration::from_millis(250),
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle for the running worker.
#[derive(Debug)]
pub struct EnrichmentHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl EnrichmentHandle {
    /// Stop taking new jobs, run the ones already queued, and wait for all of
    /// them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.join.await {
            error!(error = %e, "enrichment worker task failed");
        }
    }
}

impl EnrichmentWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(
        &self,
        repo: Arc<dyn CatalogRepository>,
        classifier: Arc<dyn LabelClassifier>,
    ) -> (EnrichmentQueue, EnrichmentHandle) {
        let (tx, rx) = mpsc::channel(self.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let cfg = self.clone();
        let join = tokio::spawn(worker_loop(cfg, repo, classifier, rx, shutdown_rx));

        (
            EnrichmentQueue { tx },
            EnrichmentHandle {
                shutdown: shutdown_tx,
                join,
            },
        )
    }
}

async fn worker_loop(
    cfg: EnrichmentWorker,
    repo: Arc<dyn CatalogRepository>,
    classifier: Arc<dyn LabelClassifier>,
    mut rx: mpsc::Receiver<EnrichmentJob>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let slots = cfg.max_concurrent.max(1);
    let permits = Arc::new(Semaphore::new(slots));
    info!(max_concurrent = slots, "enrichment worker started");

    loop {
        let job = tokio::select! {
            // Shutdown has priority.
            biased;
            _ = &mut shutdown_rx => break,
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        if !dispatch(&cfg, &permits, &repo, &classifier, job).await {
            break;
        }
    }

    // Jobs accepted before shutdown still run; new submits see a closed queue.
    rx.close();
    let mut drained = 0usize;
    while let Some(job) = rx.recv().await {
        drained += 1;
        if !dispatch(&cfg, &permits, &repo, &classifier, job).await {
            break;
        }
    }
    if drained > 0 {
        info!(jobs = drained, "drained queued enrichment jobs");
    }

    // Drain: every permit back means every in-flight job has finished.
    if let Ok(all) = permits.acquire_many(slots as u32).await {
        drop(all);
    }
    info!("enrichment worker stopped");
}

/// Run `job` on its own task once a slot is free. False when the semaphore is closed.
async fn dispatch(
    cfg: &EnrichmentWorker,
    permits: &Arc<Semaphore>,
    repo: &Arc<dyn CatalogRepository>,
    classifier: &Arc<dyn LabelClassifier>,
    job: EnrichmentJob,
) -> bool {
    let Ok(permit) = permits.clone().acquire_owned().await else {
        return false;
    };
    let cfg = cfg.clone();
    let repo = repo.clone();
    let classifier = classifier.clone();
    tokio::spawn(async move {
        run_job(&cfg, repo.as_ref(), classifier.as_ref(), job).await;
        drop(permit);
    });
    true
}

enum Attempt {
    Done,
    Retry,
}

async fn run_job(
    cfg: &EnrichmentWorker,
    repo: &dyn CatalogRepository,
    classifier: &dyn LabelClassifier,
    job: EnrichmentJob,
) {
    for attempt in 0..=cfg.max_retries {
        if attempt > 0 {
            tokio::time::sleep(backoff(cfg.base_backoff, attempt)).await;
        }

        match try_enrich(cfg, repo, classifier, &job).await {
            Attempt::Done => return,
            Attempt::Retry => continue,
        }
    }

    error!(
        product_id = %job.product_id,
        key = %job.storage_key,
        attempts = cfg.max_retries + 1,
        "enrichment gave up; existing labels left untouched"
    );
}

async fn try_enrich(
    cfg: &EnrichmentWorker,
    repo: &dyn CatalogRepository,
    classifier: &dyn LabelClassifier,
    job: &EnrichmentJob,
) -> Attempt {
    let labels = match tokio::time::timeout(cfg.call_timeout, classifier.classify(&job.storage_key)).await {
        Ok(Ok(labels)) => ConfidenceLabel::normalize(labels),
        Ok(Err(e)) => {
            warn!(product_id = %job.product_id, key = %job.storage_key, error = %e, "classifier call failed");
            return Attempt::Retry;
        }
        Err(_) => {
            warn!(product_id = %job.product_id, key = %job.storage_key, "classifier call timed out");
            return Attempt::Retry;
        }
    };

    let count = labels.len();
    match tokio::time::timeout(cfg.call_timeout, repo.replace_labels(&job.product_id, labels)).await {
        Ok(Ok(())) => {
            info!(product_id = %job.product_id, labels = count, "product labels replaced");
            Attempt::Done
        }
        Ok(Err(RepositoryError::NotFound)) => {
            debug!(product_id = %job.product_id, "product deleted before enrichment finished");
            Attempt::Done
        }
        Ok(Err(e)) => {
            warn!(product_id = %job.product_id, error = %e, "label write failed");
            Attempt::Retry
        }
        Err(_) => {
            warn!(product_id = %job.product_id, "label write timed out");
            Attempt::Retry
        }
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // Exponential backoff: base * 2^(attempt-1), capped.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::InMemoryLabelClassifier;
    use crate::repository::InMemoryCatalogRepository;
    use catalog_products::{Product, ProductDraft};

    fn worker() -> EnrichmentWorker {
        EnrichmentWorker {
            base_backoff: Duration::from_millis(1),
            call_timeout: Duration::from_millis(500),
            ..EnrichmentWorker::default()
        }
    }

    async fn seeded() -> (Arc<InMemoryCatalogRepository>, Product) {
        let repo = Arc::new(InMemoryCatalogRepository::new());
        let product = repo
            .insert_product(ProductDraft {
                name: "Boot".to_string(),
                category: "footwear".to_string(),
                image: "boot.png".to_string(),
                ..ProductDraft::default()
            })
            .await
            .unwrap();
        (repo, product)
    }

    fn job_for(product: &Product) -> EnrichmentJob {
        EnrichmentJob {
            product_id: product.id.clone(),
            storage_key: product.storage_key(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 1), Duration::from_millis(100));
        assert_eq!(backoff(base, 2), Duration::from_millis(200));
        assert_eq!(backoff(base, 3), Duration::from_millis(400));
        assert_eq!(backoff(base, 30), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn successful_job_replaces_labels() {
        let (repo, product) = seeded().await;
        let classifier = InMemoryLabelClassifier::new();
        classifier.insert("images/footwear/boot.png", vec![ConfidenceLabel::new("Boot", 99.0)]);

        run_job(&worker(), repo.as_ref(), &classifier, job_for(&product)).await;

        let stored = repo.find_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.image_labels, Some(vec![ConfidenceLabel::new("Boot", 99.0)]));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (repo, product) = seeded().await;
        let classifier = InMemoryLabelClassifier::new().with_fallback(vec![ConfidenceLabel::new("Shoe", 80.0)]);
        classifier.fail_next(2);

        run_job(&worker(), repo.as_ref(), &classifier, job_for(&product)).await;

        assert_eq!(classifier.calls(), 3);
        let stored = repo.find_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.image_labels.unwrap()[0].name, "Shoe");
    }

    #[tokio::test]
    async fn exhausted_retries_leave_existing_labels() {
        let (repo, product) = seeded().await;
        repo.replace_labels(&product.id, vec![ConfidenceLabel::new("Old", 70.0)])
            .await
            .unwrap();
        let classifier = InMemoryLabelClassifier::new();
        classifier.fail_next(100);

        run_job(&worker(), repo.as_ref(), &classifier, job_for(&product)).await;

        assert_eq!(classifier.calls(), 4);
        let stored = repo.find_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.image_labels, Some(vec![ConfidenceLabel::new("Old", 70.0)]));
    }

    #[tokio::test]
    async fn deleted_product_ends_the_job_without_retrying() {
        let (repo, product) = seeded().await;
        repo.delete_product(&product.id).await.unwrap();
        let classifier = InMemoryLabelClassifier::new().with_fallback(vec![ConfidenceLabel::new("Shoe", 80.0)]);

        run_job(&worker(), repo.as_ref(), &classifier, job_for(&product)).await;

        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn shutdown_runs_every_queued_job() {
        let repo = Arc::new(InMemoryCatalogRepository::new());
        let mut ids = Vec::new();
        for i in 0..5 {
            let product = repo
                .insert_product(ProductDraft {
                    name: format!("Boot {i}"),
                    category: "footwear".to_string(),
                    image: format!("boot-{i}.png"),
                    ..ProductDraft::default()
                })
                .await
                .unwrap();
            ids.push(product.id.clone());
        }
        let classifier = Arc::new(InMemoryLabelClassifier::new().with_fallback(vec![ConfidenceLabel::new("Shoe", 80.0)]));

        let (queue, handle) = worker().spawn(repo.clone(), classifier.clone());
        for id in &ids {
            let product = repo.find_product(id).await.unwrap().unwrap();
            queue.submit(job_for(&product));
        }
        handle.shutdown().await;

        assert_eq!(classifier.calls(), 5);
        for id in &ids {
            let stored = repo.find_product(id).await.unwrap().unwrap();
            assert!(stored.image_labels.is_some(), "{id} was not enriched");
        }
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_dropped() {
        let (repo, product) = seeded().await;
        let classifier = Arc::new(InMemoryLabelClassifier::new().with_fallback(vec![ConfidenceLabel::new("Shoe", 80.0)]));

        let (queue, handle) = worker().spawn(repo.clone(), classifier.clone());
        handle.shutdown().await;
        queue.submit(job_for(&product));

        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let queue = EnrichmentQueue { tx };
        let first = EnrichmentJob {
            product_id: ProductId::from("p-1"),
            storage_key: "images/a/b.png".to_string(),
        };
        let second = EnrichmentJob {
            product_id: ProductId::from("p-2"),
            storage_key: "images/a/c.png".to_string(),
        };
        queue.submit(first.clone());
        queue.submit(second);

        assert_eq!(rx.try_recv().unwrap(), first);
        assert!(rx.try_recv().is_err());
    }
}
