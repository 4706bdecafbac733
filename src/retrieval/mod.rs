//! Ingestion, query and extraction orchestration over a [`KnowledgeStore`].
//!
//! Provider calls (embedding, extraction) fan out on the blocking pool,
//! bounded by a semaphore, each with its own timeout and a shared
//! cancellation token. A failed, timed-out or empty call skips its chunk and
//! is counted in the report; it never aborts the batch.
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use store::{KnowledgeStore, StoreStats};

use crate::analytics::{Cluster, CommunityAssignment, detect_communities, generate_clusters};
use crate::embedder::Embedder;
use crate::extraction::{ExtractionProvider, apply_extraction, parse_extraction};
use crate::index::{EmbeddingRecord, IndexError, SearchResult};
use crate::segmenter::{Chunk, Segmenter};

const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("max concurrency must be positive")]
    InvalidConcurrency,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunks: usize,
    pub embedded: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub chunks: usize,
    pub entities_added: usize,
    pub relationships_added: usize,
    pub relationships_skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone)]
pub struct GraphAnalysis {
    pub communities: CommunityAssignment,
    pub clusters: Vec<Cluster>,
}

enum CallOutcome<T> {
    Done(T),
    Failed,
    Cancelled,
}

pub struct RetrievalCoordinator {
    segmenter: Segmenter,
    store: KnowledgeStore,
    embedder: Arc<dyn Embedder>,
    max_concurrency: usize,
    call_timeout: Duration,
}

impl RetrievalCoordinator {
    pub fn new(segmenter: Segmenter, store: KnowledgeStore, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            segmenter,
            store,
            embedder,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the provider-call bounds.
    pub fn with_limits(
        mut self,
        max_concurrency: usize,
        call_timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        if max_concurrency == 0 {
            return Err(RetrievalError::InvalidConcurrency);
        }
        self.max_concurrency = max_concurrency;
        self.call_timeout = call_timeout;
        Ok(self)
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    // ── Ingestion ────────────────────────────────────────────────────

    /// Segment `text`, embed every chunk and add the embedded ones to the
    /// index in chunk order.
    ///
    /// Fails only when the batch is rejected by the index (dimension
    /// mismatch or a non-finite vector); nothing from the batch is stored in
    /// that case.
    pub async fn ingest(
        &self,
        path: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, RetrievalError> {
        let chunks = self.segmenter.chunk(path, text);
        if chunks.is_empty() {
            debug!("Nothing to ingest from {path}");
            return Ok(IngestReport::default());
        }

        let report = self.ingest_chunks(&chunks, cancel).await?;
        info!(
            "Ingested {path}: {} chunks, {} embedded, {} skipped, {} cancelled",
            report.chunks, report.embedded, report.skipped, report.cancelled
        );
        Ok(report)
    }

    /// Embed already segmented chunks and add them to the index in order.
    pub async fn ingest_chunks(
        &self,
        chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Result<IngestReport, RetrievalError> {
        let mut report = IngestReport {
            chunks: chunks.len(),
            ..IngestReport::default()
        };
        if chunks.is_empty() {
            return Ok(report);
        }

        let embedder = Arc::clone(&self.embedder);
        let inputs = chunks.iter().map(|c| c.content.clone()).collect();
        let outcomes = self
            .fan_out(inputs, cancel, move |text| {
                embedder.embed(text).map_err(|e| e.to_string())
            })
            .await;

        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, outcome) in chunks.iter().zip(outcomes) {
            match outcome {
                CallOutcome::Done(vector) if !vector.is_empty() => {
                    records.push(EmbeddingRecord::new(
                        chunk.reference.as_str(),
                        chunk.content.as_str(),
                        vector,
                    ));
                }
                CallOutcome::Done(_) => {
                    debug!("Empty embedding for {}, skipping", chunk.reference);
                    report.skipped += 1;
                }
                CallOutcome::Failed => report.skipped += 1,
                CallOutcome::Cancelled => report.cancelled += 1,
            }
        }

        if !records.is_empty() {
            report.embedded = self.store.index.write().await.add(records)?;
        }
        Ok(report)
    }

    // ── Query ────────────────────────────────────────────────────────

    /// Top-`top_k` chunks for `text`, keeping only those scoring at or above
    /// the mean of the returned set. A failed or empty query embedding
    /// yields no results.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>, RetrievalError> {
        let embedder = Arc::clone(&self.embedder);
        let owned = text.to_string();
        let work = tokio::task::spawn_blocking(move || embedder.embed(&owned));

        let vector = match tokio::time::timeout(self.call_timeout, work).await {
            Ok(Ok(Ok(vector))) => vector,
            Ok(Ok(Err(e))) => {
                warn!("Query embedding failed: {e}");
                return Ok(Vec::new());
            }
            Ok(Err(e)) => {
                warn!("Query embedding task failed: {e}");
                return Ok(Vec::new());
            }
            Err(_) => {
                warn!("Query embedding timed out after {:?}", self.call_timeout);
                return Ok(Vec::new());
            }
        };
        if vector.is_empty() {
            debug!("Empty query embedding, returning no results");
            return Ok(Vec::new());
        }

        let candidates = self.store.index.read().await.search(&vector, top_k)?;
        let kept = filter_above_mean(candidates);
        debug!("Query kept {} results", kept.len());
        Ok(kept)
    }

    // ── Extraction ───────────────────────────────────────────────────

    /// Run the extraction provider over `chunks` and write the results into
    /// the graph. Payloads are applied serially, in chunk order, under the
    /// graph write lock.
    pub async fn extract_graph(
        &self,
        chunks: &[Chunk],
        provider: Arc<dyn ExtractionProvider>,
        cancel: &CancellationToken,
    ) -> ExtractionReport {
        let mut report = ExtractionReport {
            chunks: chunks.len(),
            ..ExtractionReport::default()
        };
        if chunks.is_empty() {
            return report;
        }

        let inputs = chunks.iter().map(|c| c.content.clone()).collect();
        let outcomes = self
            .fan_out(inputs, cancel, move |text| {
                provider.extract(text).map_err(|e| e.to_string())
            })
            .await;

        let mut graph = self.store.graph.write().await;
        for (chunk, outcome) in chunks.iter().zip(outcomes) {
            match outcome {
                CallOutcome::Done(raw) => match parse_extraction(&raw) {
                    Ok(payload) => {
                        let applied = apply_extraction(&mut graph, &payload, &chunk.reference);
                        report.entities_added += applied.entities_added;
                        report.relationships_added += applied.relationships_added;
                        report.relationships_skipped += applied.relationships_skipped;
                    }
                    Err(e) => {
                        warn!("Skipping extraction for {}: {e}", chunk.reference);
                        report.failed += 1;
                    }
                },
                CallOutcome::Failed => report.failed += 1,
                CallOutcome::Cancelled => report.cancelled += 1,
            }
        }

        info!(
            "Extracted graph from {} chunks: +{} entities, +{} relationships ({} skipped), {} failed",
            report.chunks,
            report.entities_added,
            report.relationships_added,
            report.relationships_skipped,
            report.failed
        );
        report
    }

    /// Community detection and cluster statistics over the current graph.
    pub async fn analyze(&self) -> GraphAnalysis {
        let graph = self.store.graph.read().await;
        let communities = detect_communities(&graph);
        let clusters = generate_clusters(&graph, &communities);
        GraphAnalysis {
            communities,
            clusters,
        }
    }

    // ── Fan-out ──────────────────────────────────────────────────────

    /// Run `call` over every input on the blocking pool, at most
    /// `max_concurrency` calls in flight. Outcomes come back in input order.
    async fn fan_out<T, F>(
        &self,
        inputs: Vec<String>,
        cancel: &CancellationToken,
        call: F,
    ) -> Vec<CallOutcome<T>>
    where
        T: Send + 'static,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        let call = Arc::new(call);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let limit = self.call_timeout;
        let total = inputs.len();
        let mut tasks = JoinSet::new();

        for (position, input) in inputs.into_iter().enumerate() {
            let call = Arc::clone(&call);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => CallOutcome::Cancelled,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => {
                            // Held until the blocking call returns, even past a timeout.
                            let work = tokio::task::spawn_blocking(move || {
                                let _permit = permit;
                                (*call)(&input)
                            });
                            tokio::select! {
                                biased;
                                _ = cancel.cancelled() => CallOutcome::Cancelled,
                                finished = tokio::time::timeout(limit, work) => match finished {
                                    Ok(Ok(Ok(value))) => CallOutcome::Done(value),
                                    Ok(Ok(Err(e))) => {
                                        warn!("Provider call {position} failed: {e}");
                                        CallOutcome::Failed
                                    }
                                    Ok(Err(e)) => {
                                        warn!("Provider task {position} failed: {e}");
                                        CallOutcome::Failed
                                    }
                                    Err(_) => {
                                        warn!("Provider call {position} timed out after {limit:?}");
                                        CallOutcome::Failed
                                    }
                                },
                            }
                        }
                        Err(_) => CallOutcome::Failed,
                    },
                };
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<CallOutcome<T>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => slots[position] = Some(outcome),
                Err(e) => warn!("Provider task panicked: {e}"),
            }
        }
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(CallOutcome::Failed))
            .collect()
    }
}

/// Keep results scoring at or above the mean score of `results`.
pub fn filter_above_mean(results: Vec<SearchResult>) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }
    let mean =
        results.iter().map(|r| f64::from(r.score)).sum::<f64>() / results.len() as f64;
    results
        .into_iter()
        .filter(|r| f64::from(r.score) >= mean)
        .collect()
}
