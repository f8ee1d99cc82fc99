//! # Batch Orchestrator Module
//!
//! Runs the site-analysis pipeline over a list of URLs with bounded
//! concurrency.
//!
//! Input URLs are deduplicated in first-seen order and each unique URL is
//! analyzed exactly once by its own task, gated by a semaphore. Every
//! failure is folded into that URL's record, so one bad site never affects
//! its siblings. Completed records go to an append-only [`ResultStore`];
//! every `checkpoint_every` completions a snapshot merged against the input
//! order is handed to a [`CheckpointSink`]. The final [`BatchOutput`]
//! re-expands the records across the original, possibly duplicated, order.

mod checkpoint;
mod config;
mod pipeline;
mod record;
mod store;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointRow, CheckpointSink, JsonCheckpointSink, NullCheckpointSink};
pub use config::{BatchConfig, BatchConfigBuilder};
pub use record::{AnalysisRecord, SiteStatus, UrlState};
pub use store::ResultStore;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use rig::completion::CompletionModel;
use tokio::sync::{Semaphore, mpsc};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use crate::classifier::{NoopDetector, TechnologyClassifier, TechnologyDetector};
use crate::error::{Error, Result, SiteError};
use crate::extractor::ContentExtractor;
use crate::fetcher::{FetcherConfig, PageFetcher};
use crate::summarizer::Summarizer;
use pipeline::Pipeline;

/// Sent once per completed unique URL
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub url: String,
    pub completed: usize,
    pub total: usize,
    pub failed: bool,
}

/// Records of a finished batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// One record per unique URL
    pub records: HashMap<String, AnalysisRecord>,

    /// The input URLs, duplicates included, in input order
    pub order: Vec<String>,
}

impl BatchOutput {
    /// One record per input row, in input order
    pub fn expand(&self) -> Vec<AnalysisRecord> {
        self.order
            .iter()
            .map(|url| {
                self.records
                    .get(url)
                    .cloned()
                    .unwrap_or_else(|| AnalysisRecord::unknown(url.as_str()))
            })
            .collect()
    }

    /// Unique URLs whose record carries an error placeholder
    pub fn failures(&self) -> usize {
        self.records.values().filter(|record| record.is_failure()).count()
    }
}

/// Bounded-concurrency driver of the per-URL pipeline
pub struct BatchOrchestrator<M: CompletionModel> {
    pipeline: Arc<Pipeline<M>>,
    sink: Arc<dyn CheckpointSink>,
    config: BatchConfig,
    progress: Option<mpsc::Sender<ProgressUpdate>>,
}

impl<M: CompletionModel + 'static> BatchOrchestrator<M> {
    pub fn builder(summarizer: Summarizer<M>) -> BatchOrchestratorBuilder<M> {
        BatchOrchestratorBuilder::new(summarizer)
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Analyze every URL. Always yields exactly one record per unique URL.
    #[instrument(skip_all, fields(rows = urls.len()))]
    pub async fn run(&self, urls: &[String]) -> BatchOutput {
        let unique = unique_in_order(urls);
        info!(
            "Analyzing {} unique URLs ({} rows) with concurrency {}",
            unique.len(),
            urls.len(),
            self.config.concurrency
        );

        let collector = Collector {
            store: ResultStore::new(),
            sink: self.sink.clone(),
            order: Arc::new(urls.to_vec()),
            config: self.config.clone(),
            progress: self.progress.clone(),
            total: unique.len(),
        };
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        let tasks = unique
            .iter()
            .map(|url| {
                let permit = semaphore.clone().acquire_owned();
                let pipeline = self.pipeline.clone();
                let collector = collector.clone();
                let url = url.clone();

                tokio::spawn(async move {
                    let record = match permit.await {
                        Ok(_permit) => {
                            let span = info_span!("analyze_url", url = %url);
                            pipeline.analyze(&url).instrument(span).await
                        }
                        Err(e) => {
                            error!("Error processing {}: {}", url, SiteError::UnknownException(e.to_string()));
                            AnalysisRecord::unknown(url.as_str())
                        }
                    };
                    collector.complete(record).await;
                })
            })
            .collect::<Vec<_>>();

        let results = future::join_all(tasks).await;

        for (url, result) in unique.iter().zip(results) {
            if let Err(e) = result {
                error!("Error processing {}: {}", url, SiteError::UnknownException(e.to_string()));
                if !collector.store.contains(url).await {
                    collector.complete(AnalysisRecord::unknown(url.as_str())).await;
                }
            }
        }

        let records = collector.store.snapshot().await;
        let output = BatchOutput {
            records,
            order: urls.to_vec(),
        };
        info!(
            "Batch complete: {} unique URLs, {} failed",
            output.records.len(),
            output.failures()
        );
        output
    }
}

/// Deduplicate, keeping the first occurrence of each URL
pub fn unique_in_order(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

/// Shared completion path of every worker
#[derive(Clone)]
struct Collector {
    store: ResultStore,
    sink: Arc<dyn CheckpointSink>,
    order: Arc<Vec<String>>,
    config: BatchConfig,
    progress: Option<mpsc::Sender<ProgressUpdate>>,
    total: usize,
}

impl Collector {
    async fn complete(&self, record: AnalysisRecord) {
        let url = record.url.clone();
        let failed = record.is_failure();
        let completed = self.store.insert(record).await;

        if let Some(progress) = &self.progress {
            let update = ProgressUpdate {
                url,
                completed,
                total: self.total,
                failed,
            };
            if progress.send(update).await.is_err() {
                debug!("Progress receiver dropped");
            }
        }

        if self.config.checkpoint_due(completed) {
            self.checkpoint(completed).await;
        }
    }

    async fn checkpoint(&self, trigger: usize) {
        let records = self.store.snapshot().await;
        let checkpoint = Checkpoint::new(&self.order, &records);
        match self.sink.write(trigger, &checkpoint).await {
            Ok(()) => info!("Saved intermediate results after {} URLs", trigger),
            Err(e) => warn!("Failed to save intermediate results after {} URLs: {}", trigger, e),
        }
    }
}

/// Builder for BatchOrchestrator
pub struct BatchOrchestratorBuilder<M: CompletionModel> {
    summarizer: Summarizer<M>,
    config: BatchConfig,
    fetcher_config: FetcherConfig,
    extractor: ContentExtractor,
    detector: Arc<dyn TechnologyDetector>,
    detector_timeout: Duration,
    sink: Arc<dyn CheckpointSink>,
    progress: Option<mpsc::Sender<ProgressUpdate>>,
}

impl<M: CompletionModel> BatchOrchestratorBuilder<M> {
    pub fn new(summarizer: Summarizer<M>) -> Self {
        Self {
            summarizer,
            config: BatchConfig::default(),
            fetcher_config: FetcherConfig::default(),
            extractor: ContentExtractor::default(),
            detector: Arc::new(NoopDetector),
            detector_timeout: Duration::from_secs(30),
            sink: Arc::new(NullCheckpointSink),
            progress: None,
        }
    }

    /// Set the batch configuration
    pub fn config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the fetcher configuration
    pub fn fetcher_config(mut self, config: FetcherConfig) -> Self {
        self.fetcher_config = config;
        self
    }

    /// Set the content extractor
    pub fn extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set the external technology detector
    pub fn detector(mut self, detector: Arc<dyn TechnologyDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Bound each detector call
    pub fn detector_timeout(mut self, timeout: Duration) -> Self {
        self.detector_timeout = timeout;
        self
    }

    /// Set where checkpoints are written
    pub fn checkpoint_sink(mut self, sink: Arc<dyn CheckpointSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Receive one update per completed URL
    pub fn progress(mut self, sender: mpsc::Sender<ProgressUpdate>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<BatchOrchestrator<M>> {
        if self.config.concurrency == 0 || self.config.concurrency > Semaphore::MAX_PERMITS {
            return Err(Error::Config(format!(
                "concurrency must be between 1 and {}",
                Semaphore::MAX_PERMITS
            )));
        }

        let fetcher = PageFetcher::new(self.fetcher_config)?;
        let classifier =
            TechnologyClassifier::new(self.detector).with_detector_timeout(self.detector_timeout);

        Ok(BatchOrchestrator {
            pipeline: Arc::new(Pipeline {
                fetcher,
                extractor: self.extractor,
                classifier,
                summarizer: self.summarizer,
                strategy: self.config.fetch_strategy,
                fetch_deadline: self.config.url_timeout,
            }),
            sink: self.sink,
            config: self.config,
            progress: self.progress,
        })
    }
}
