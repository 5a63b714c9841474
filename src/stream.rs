//! Two-phase result delivery.
//!
//! Phase 1 executes the query and hands the first bounded batch straight back
//! to the caller. Phase 2 pages the rest of the same result set out to an
//! injected [`BatchSink`] from the blocking pool, checking a cancellation flag
//! between batches. Each streamer is one consumer slot: starting a new stream
//! cancels the delivery that was active before it.

use crate::error::ExecError;
use crate::query::Query;
use crate::search::{Match, ResultSet, SearchEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub const DEFAULT_FIRST_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Receives phase-2 batches. Called from a background thread.
pub trait BatchSink: Send + Sync {
    fn on_batch(&self, batch: &[Match], is_final: bool);
}

impl<F> BatchSink for F
where
    F: Fn(&[Match], bool) + Send + Sync,
{
    fn on_batch(&self, batch: &[Match], is_final: bool) {
        self(batch, is_final)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub first_batch_size: usize,
    pub batch_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            first_batch_size: DEFAULT_FIRST_BATCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// The synchronous part of a stream.
#[derive(Debug, Clone)]
pub struct FirstBatch {
    pub matches: Vec<Match>,
    /// No phase-2 batches follow.
    pub is_final: bool,
    /// Size of the whole result set.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every phase-2 batch reached the sink.
    Completed { batches: usize },
    /// Cancellation was observed after `batches` phase-2 batches.
    Cancelled { batches: usize },
    /// The delivery task panicked or was torn down with its runtime.
    Aborted,
}

pub struct StreamHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<DeliveryOutcome>>,
}

impl StreamHandle {
    /// Stop delivering. A batch already handed to the sink is not interrupted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for phase 2 to end.
    pub async fn join(self) -> DeliveryOutcome {
        let Some(task) = self.task else {
            return DeliveryOutcome::Completed { batches: 0 };
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Result delivery aborted: {}", e);
                DeliveryOutcome::Aborted
            }
        }
    }
}

pub struct ResultStreamer {
    engine: Arc<SearchEngine>,
    runtime: Handle,
    options: StreamOptions,
    /// Cancellation flag of the most recent delivery in this slot.
    active: Mutex<Option<Arc<AtomicBool>>>,
}

impl ResultStreamer {
    pub fn new(engine: Arc<SearchEngine>, runtime: Handle, options: StreamOptions) -> Self {
        Self {
            engine,
            runtime,
            options,
            active: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<SearchEngine> {
        &self.engine
    }

    pub fn options(&self) -> StreamOptions {
        self.options
    }

    /// Execute `query`, return its first batch and deliver the remainder to `sink`.
    ///
    /// Any previous delivery of this streamer is cancelled first. Errors are
    /// returned before anything is delivered.
    pub fn stream(
        &self,
        query: &Query,
        sink: Arc<dyn BatchSink>,
    ) -> Result<(FirstBatch, StreamHandle), ExecError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&cancelled));
        if let Some(previous) = previous {
            if !previous.swap(true, Ordering::SeqCst) {
                tracing::debug!("Cancelled previous delivery");
            }
        }

        let results = self.engine.execute(query)?;
        let first_len = self.options.first_batch_size.min(results.len());
        let first = FirstBatch {
            matches: results.matches()[..first_len].to_vec(),
            is_final: first_len == results.len(),
            total: results.len(),
        };

        if first.is_final {
            return Ok((first, StreamHandle { cancelled, task: None }));
        }

        let batch_size = self.options.batch_size.max(1);
        let flag = Arc::clone(&cancelled);
        let task = self
            .runtime
            .spawn_blocking(move || deliver(&results, first_len, batch_size, &flag, sink.as_ref()));

        Ok((
            first,
            StreamHandle {
                cancelled,
                task: Some(task),
            },
        ))
    }

    /// Cancel whatever delivery is active in this slot.
    pub fn cancel_active(&self) {
        if let Some(active) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            active.store(true, Ordering::SeqCst);
        }
    }
}

fn deliver(
    results: &ResultSet,
    offset: usize,
    batch_size: usize,
    cancelled: &AtomicBool,
    sink: &dyn BatchSink,
) -> DeliveryOutcome {
    let rest = &results.matches()[offset..];
    let total_batches = rest.len().div_ceil(batch_size);

    for (i, batch) in rest.chunks(batch_size).enumerate() {
        if cancelled.load(Ordering::SeqCst) {
            tracing::debug!(
                "Delivery of '{}' cancelled after {} of {} batches",
                results.query(),
                i,
                total_batches
            );
            return DeliveryOutcome::Cancelled { batches: i };
        }
        sink.on_batch(batch, i + 1 == total_batches);
    }

    tracing::debug!(
        "Delivered '{}' in {} background batches",
        results.query(),
        total_batches
    );
    DeliveryOutcome::Completed {
        batches: total_batches,
    }
}
