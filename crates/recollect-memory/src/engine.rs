// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory engine: turn ingestion and query-time retrieval.
//!
//! Ingestion extracts entries on the caller's task and hands them to a
//! bounded queue. A single background worker persists, indexes, then
//! publishes each batch. Retrieval reads whatever has been published so far
//! and never waits on extraction.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use recollect_config::RecollectConfig;
use recollect_config::model::RetrievalConfig;
use recollect_core::{EntryStore, MemoryEntry, RankedResult, RecollectError};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::conflict::{ConflictResolver, ScoredCandidate};
use crate::extraction::{ExtractionOrchestrator, ExtractionPath};
use crate::index::SimilarityIndex;
use crate::inject::format_injection;
use crate::recording;
use crate::rerank::{MULTI_SIGNAL_RERANK, Reranker, SEMANTIC_ONLY, semantic_only};
use crate::scoring::DecayPolicy;

/// Entries embedded per batch while rebuilding the index at startup.
const REBUILD_BATCH: usize = 256;
/// Smallest candidate pool requested from the similarity index.
const MIN_CANDIDATE_POOL: usize = 10;

type Published = Arc<RwLock<HashMap<String, MemoryEntry>>>;

enum IngestJob {
    Commit {
        entries: Vec<MemoryEntry>,
        ack: oneshot::Sender<Result<(), RecollectError>>,
    },
    Flush {
        ack: oneshot::Sender<Result<(), RecollectError>>,
    },
}

/// Resolves once the ingest worker has durably committed a batch.
///
/// Dropping the handle does not cancel the commit.
#[derive(Debug)]
pub struct CommitHandle {
    rx: Option<oneshot::Receiver<Result<(), RecollectError>>>,
}

impl CommitHandle {
    fn ready() -> Self {
        Self { rx: None }
    }

    /// Wait for the worker's verdict on this batch.
    pub async fn wait(self) -> Result<(), RecollectError> {
        match self.rx {
            None => Ok(()),
            Some(rx) => rx.await.map_err(|_| RecollectError::IngestClosed)?,
        }
    }
}

/// Result of [`MemoryEngine::process_turn`].
#[derive(Debug)]
pub struct TurnOutcome {
    pub turn: u64,
    pub extracted: Vec<MemoryEntry>,
    pub path: ExtractionPath,
    pub extraction_latency: Duration,
    pub commit: CommitHandle,
}

/// Result of [`MemoryEngine::retrieve`].
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub turn: u64,
    pub results: Vec<RankedResult>,
    pub retrieval_latency: Duration,
    pub injected_context: String,
}

pub struct MemoryEngine {
    retrieval: RetrievalConfig,
    decay: DecayPolicy,
    resolver: ConflictResolver,
    reranker: Reranker,
    store: Arc<dyn EntryStore>,
    index: Arc<SimilarityIndex>,
    orchestrator: Arc<ExtractionOrchestrator>,
    published: Published,
    turn: AtomicU64,
    /// Serializes read-modify-persist of usage counters against each other
    /// and against the ingest worker's store writes.
    usage: Arc<Mutex<()>>,
    ingest: std::sync::Mutex<Option<mpsc::Sender<IngestJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryEngine {
    /// Load every persisted entry, rebuild the index, and start the ingest
    /// worker. The current turn starts at the largest persisted source turn.
    pub async fn start(
        config: &RecollectConfig,
        store: Arc<dyn EntryStore>,
        index: SimilarityIndex,
        orchestrator: ExtractionOrchestrator,
    ) -> Result<Self, RecollectError> {
        let loaded = store.load_all().await?;
        for chunk in loaded.chunks(REBUILD_BATCH) {
            index.add(chunk).await?;
        }
        let max_turn = loaded.iter().map(|e| e.source_turn).max().unwrap_or(0);
        let count = loaded.len();
        let published: Published = Arc::new(RwLock::new(
            loaded.into_iter().map(|e| (e.id.clone(), e)).collect(),
        ));
        info!(entries = count, turn = max_turn, store = store.name(), "memory index rebuilt");

        let index = Arc::new(index);
        let usage = Arc::new(Mutex::new(()));
        let (tx, rx) = mpsc::channel(config.ingest.queue_capacity.max(1));
        let worker = tokio::spawn(run_ingest_worker(
            rx,
            store.clone(),
            index.clone(),
            published.clone(),
            usage.clone(),
        ));

        let retrieval = config.retrieval.clone();
        Ok(Self {
            decay: DecayPolicy::new(retrieval.decay_lambda, retrieval.max_memory_age_turns),
            resolver: ConflictResolver::new(&retrieval.conflict),
            reranker: Reranker::new(retrieval.weights.clone()),
            retrieval,
            store,
            index,
            orchestrator: Arc::new(orchestrator),
            published,
            turn: AtomicU64::new(max_turn),
            usage,
            ingest: std::sync::Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn current_turn(&self) -> u64 {
        self.turn.load(Ordering::SeqCst)
    }

    /// Move the turn clock forward to `turn`. Never moves it back.
    /// Returns the resulting current turn.
    pub fn advance_turn_to(&self, turn: u64) -> u64 {
        self.turn.fetch_max(turn, Ordering::SeqCst).max(turn)
    }

    pub fn orchestrator(&self) -> &ExtractionOrchestrator {
        &self.orchestrator
    }

    /// Number of entries visible to retrieval.
    pub async fn entry_count(&self) -> usize {
        self.published.read().await.len()
    }

    /// Published copy of one entry, including its usage counters.
    pub async fn entry(&self, id: &str) -> Option<MemoryEntry> {
        self.published.read().await.get(id).cloned()
    }

    /// Ingest one turn: advance the clock, extract, and queue the commit.
    ///
    /// Extraction never fails. The only error is a closed ingest queue.
    pub async fn process_turn(&self, text: &str) -> Result<TurnOutcome, RecollectError> {
        // A closed queue must not consume a turn number.
        self.sender()?;
        let turn = self.turn.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        let outcome = self.orchestrator.extract(text, turn).await;
        let extraction_latency = started.elapsed();

        let commit = self.enqueue(outcome.entries.clone()).await?;
        debug!(turn, extracted = outcome.entries.len(), path = %outcome.path, "turn processed");
        Ok(TurnOutcome {
            turn,
            extracted: outcome.entries,
            path: outcome.path,
            extraction_latency,
            commit,
        })
    }

    /// Validate and queue externally produced entries.
    pub async fn commit_entries(
        &self,
        entries: Vec<MemoryEntry>,
    ) -> Result<CommitHandle, RecollectError> {
        for entry in &entries {
            entry.validate()?;
        }
        self.enqueue(entries).await
    }

    /// Resolves once every commit queued before this call has been handled.
    ///
    /// Fails if any commit since the previous flush failed, so callers that
    /// dropped their [`CommitHandle`]s still learn about lost writes.
    pub async fn flush(&self) -> Result<(), RecollectError> {
        let (ack, rx) = oneshot::channel();
        self.sender()?
            .send(IngestJob::Flush { ack })
            .await
            .map_err(|_| RecollectError::IngestClosed)?;
        rx.await.map_err(|_| RecollectError::IngestClosed)?
    }

    /// Close the ingest queue and wait for the worker to drain it.
    pub async fn shutdown(&self) -> Result<(), RecollectError> {
        let sender = self
            .ingest
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        drop(sender);

        if let Some(worker) = self.worker.lock().await.take() {
            worker
                .await
                .map_err(|e| RecollectError::Internal(format!("ingest worker panicked: {e}")))?;
        }
        info!("memory engine shut down");
        Ok(())
    }

    /// Answer a query against committed state.
    ///
    /// 1. Pulls a candidate pool of `max(10, top_k * 3)` from the index
    /// 2. Drops entries past the age cutoff and applies decay and confidence
    /// 3. Keeps one survivor per `(kind, key)`
    /// 4. Reranks (or sorts by decayed score) and truncates to `top_k`
    /// 5. Bumps usage counters and persists them
    /// 6. Renders the injection text
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalOutcome, RecollectError> {
        let started = Instant::now();
        let turn = self.current_turn();
        let top_k = self.retrieval.top_k;

        // Step 1: Candidate pool
        let pool = MIN_CANDIDATE_POOL.max(top_k.saturating_mul(3));
        let hits = self.index.search(query, pool).await?;

        // Step 2: Decay and cutoff
        let candidates: Vec<ScoredCandidate> = {
            let published = self.published.read().await;
            hits.into_iter()
                .filter_map(|(id, hybrid)| {
                    let entry = published.get(&id)?;
                    let score = self.decay.score(hybrid, entry, turn)?;
                    Some(ScoredCandidate::new(entry.clone(), score))
                })
                .collect()
        };

        // Step 3: Conflict resolution
        let resolved = self.resolver.resolve(candidates);

        // Step 4: Ranking
        let (ranked, ranker) = if self.retrieval.rerank && !resolved.is_empty() {
            (
                self.reranker.rerank(query, resolved, top_k),
                MULTI_SIGNAL_RERANK,
            )
        } else {
            (semantic_only(resolved, top_k), SEMANTIC_ONLY)
        };

        // Step 5: Usage side effect
        let results = self.record_usage(ranked, ranker, turn).await?;

        // Step 6: Injection text
        let injected_context = format_injection(&results, self.retrieval.max_injected_words);
        let retrieval_latency = started.elapsed();
        recording::record_retrieval_latency(retrieval_latency.as_secs_f64());
        debug!(turn, results = results.len(), ranker, "retrieval complete");

        Ok(RetrievalOutcome {
            turn,
            results,
            retrieval_latency,
            injected_context,
        })
    }

    async fn record_usage(
        &self,
        ranked: Vec<ScoredCandidate>,
        ranker: &'static str,
        turn: u64,
    ) -> Result<Vec<RankedResult>, RecollectError> {
        if ranked.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.usage.lock().await;

        let results: Vec<RankedResult> = {
            let published = self.published.read().await;
            ranked
                .into_iter()
                .map(|candidate| {
                    let mut entry = published
                        .get(&candidate.entry.id)
                        .cloned()
                        .unwrap_or(candidate.entry);
                    entry.use_count += 1;
                    entry.last_used_turn = Some(turn);
                    RankedResult {
                        entry,
                        score: candidate.score,
                        ranker,
                    }
                })
                .collect()
        };

        let updated: Vec<MemoryEntry> = results.iter().map(|r| r.entry.clone()).collect();
        self.store.upsert(&updated).await?;

        let mut published = self.published.write().await;
        for entry in updated {
            published.insert(entry.id.clone(), entry);
        }
        Ok(results)
    }

    fn sender(&self) -> Result<mpsc::Sender<IngestJob>, RecollectError> {
        self.ingest
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(RecollectError::IngestClosed)
    }

    async fn enqueue(&self, entries: Vec<MemoryEntry>) -> Result<CommitHandle, RecollectError> {
        let sender = self.sender()?;
        if entries.is_empty() {
            return Ok(CommitHandle::ready());
        }
        let (ack, rx) = oneshot::channel();
        sender
            .send(IngestJob::Commit { entries, ack })
            .await
            .map_err(|_| RecollectError::IngestClosed)?;
        Ok(CommitHandle { rx: Some(rx) })
    }
}

async fn run_ingest_worker(
    mut rx: mpsc::Receiver<IngestJob>,
    store: Arc<dyn EntryStore>,
    index: Arc<SimilarityIndex>,
    published: Published,
    usage: Arc<Mutex<()>>,
) {
    let mut failed_since_flush = 0usize;
    let mut last_failure = String::new();

    while let Some(job) = rx.recv().await {
        match job {
            IngestJob::Commit { entries, ack } => {
                let count = entries.len();
                let result = commit_batch(entries, store.as_ref(), &index, &published, &usage).await;
                match &result {
                    Ok(()) => {
                        recording::record_committed(count);
                        debug!(count, "batch committed");
                    }
                    Err(e) => {
                        error!(error = %e, count, "failed to commit memory entries");
                        failed_since_flush += 1;
                        last_failure = e.to_string();
                    }
                }
                // The caller may have dropped its handle.
                let _ = ack.send(result);
            }
            IngestJob::Flush { ack } => {
                let verdict = if failed_since_flush == 0 {
                    Ok(())
                } else {
                    Err(RecollectError::Storage {
                        source: format!(
                            "{failed_since_flush} commit(s) failed since the last flush; last error: {last_failure}"
                        )
                        .into(),
                    })
                };
                failed_since_flush = 0;
                let _ = ack.send(verdict);
            }
        }
    }
    debug!("ingest worker stopped");
}

/// Embed, persist, then append and publish.
///
/// Embedding runs before the store write, so an embedder failure leaves the
/// batch neither stored nor indexed. The usage lock is held from the store
/// write through publication.
async fn commit_batch(
    entries: Vec<MemoryEntry>,
    store: &dyn EntryStore,
    index: &SimilarityIndex,
    published: &RwLock<HashMap<String, MemoryEntry>>,
    usage: &Mutex<()>,
) -> Result<(), RecollectError> {
    let fresh: Vec<MemoryEntry> = {
        let published = published.read().await;
        entries
            .iter()
            .filter(|e| !published.contains_key(&e.id))
            .cloned()
            .collect()
    };
    let prepared = index.prepare(&fresh).await?;

    let _guard = usage.lock().await;
    store.upsert(&entries).await?;
    index.append(prepared).await?;

    let mut published = published.write().await;
    for entry in entries {
        published.insert(entry.id.clone(), entry);
    }
    Ok(())
}
