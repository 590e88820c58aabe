use crate::error::PoolError;
use crate::result_set::{Completion, ResultSet};
use crate::task::{Outcome, WorkUnit};
use crate::work_queue::{QueuedUnit, WorkQueue};

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::runtime::Handle as TokioHandle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_RUN_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// The concurrency limit used when the caller has no better figure: three workers per logical CPU.
pub fn default_concurrency_limit() -> usize {
  (num_cpus::get() * 3).max(1)
}

/// Runs batches of [`WorkUnit`]s with at most `concurrency_limit` operations in flight.
///
/// A pool holds no per-run state, so a single instance may be reused (or cloned) for any
/// number of runs.
#[derive(Debug, Clone)]
pub struct WorkerPool {
  pool_name: Arc<String>,
  concurrency_limit: usize,
  tokio_handle: TokioHandle,
}

impl WorkerPool {
  /// Creates a pool. A `concurrency_limit` of `0` is clamped to `1`.
  pub fn new(concurrency_limit: usize, tokio_handle: TokioHandle, pool_name: &str) -> Self {
    if concurrency_limit == 0 {
      warn!(pool_name = %pool_name, "Concurrency limit of 0 requested; clamping to 1 (sequential execution).");
    }
    Self {
      pool_name: Arc::new(pool_name.to_string()),
      concurrency_limit: concurrency_limit.max(1),
      tokio_handle,
    }
  }

  /// Like [`WorkerPool::new`], but rejects a `concurrency_limit` of `0` instead of clamping it.
  pub fn try_new(concurrency_limit: usize, tokio_handle: TokioHandle, pool_name: &str) -> Result<Self, PoolError> {
    if concurrency_limit == 0 {
      return Err(PoolError::InvalidConcurrencyLimit(concurrency_limit));
    }
    Ok(Self::new(concurrency_limit, tokio_handle, pool_name))
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  pub fn concurrency_limit(&self) -> usize {
    self.concurrency_limit
  }

  /// Runs every unit to completion and returns one outcome per distinct identity.
  ///
  /// Units are pulled from a shared queue by `min(concurrency_limit, units.len())` workers. A
  /// failing or panicking operation never stops its siblings. Each worker keeps its outcomes to
  /// itself; they are merged only after all workers have been joined.
  ///
  /// An empty `units` list returns an empty [`ResultSet`] without spawning anything.
  ///
  /// If the Tokio runtime is shut down mid-run, a worker it drops loses the outcomes it had
  /// collected, and units still queued when every worker is gone are never recorded. The
  /// returned set then holds fewer entries than were submitted.
  pub async fn run<K, E>(&self, units: Vec<WorkUnit<K, E>>) -> ResultSet<K, E>
  where
    K: Eq + Hash + Clone + Send + 'static,
    E: Send + 'static,
  {
    let run_id = NEXT_RUN_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);

    if units.is_empty() {
      debug!(pool_name = %self.pool_name, %run_id, "Run: No units submitted. Nothing to do.");
      return ResultSet::default();
    }

    let total_units = units.len();
    let worker_count = self.concurrency_limit.min(total_units);
    let queue = Arc::new(WorkQueue::new(units));

    async move {
      info!(units = total_units, workers = worker_count, "Dispatching units to workers.");

      let worker_handles: Vec<JoinHandle<Vec<Completion<K, E>>>> = (0..worker_count)
        .map(|worker_id| {
          self
            .tokio_handle
            .spawn(Self::run_worker(queue.clone()).instrument(info_span!("batch_worker", %worker_id)))
        })
        .collect();

      let mut worker_buffers = Vec::with_capacity(worker_count);
      for (worker_id, joined) in join_all(worker_handles).await.into_iter().enumerate() {
        match joined {
          Ok(completed) => worker_buffers.push(completed),
          Err(join_error) => {
            // Operation panics are caught inside the worker, so this only happens when the
            // runtime drops the worker (e.g. during shutdown).
            error!(%worker_id, "Worker did not finish: {:?}. Its outcomes are lost.", join_error);
          }
        }
      }

      let results = ResultSet::merge(worker_buffers);
      info!(
        succeeded = results.success_count(),
        failed = results.failure_count(),
        "Run complete. All workers joined and outcomes merged."
      );
      results
    }
    .instrument(info_span!("batch_run", pool_name = %self.pool_name, %run_id))
    .await
  }

  async fn run_worker<K, E>(queue: Arc<WorkQueue<K, E>>) -> Vec<Completion<K, E>>
  where
    K: Send + 'static,
    E: Send + 'static,
  {
    let mut completed = Vec::new();

    while let Some(QueuedUnit { index, unit }) = queue.pop() {
      trace!(%index, remaining = queue.len(), "Dequeued unit. Invoking its operation.");
      let outcome = unit.operation.invoke().await;
      match &outcome {
        Outcome::Success => trace!(%index, "Unit succeeded."),
        Outcome::Failed(_) => debug!(%index, "Unit failed. Continuing with the remaining units."),
        Outcome::Aborted(reason) => error!(%index, "Unit aborted: {}", reason),
      }
      completed.push(Completion {
        index,
        identity: unit.identity,
        outcome,
      });
    }

    debug!(processed = completed.len(), "Work queue drained. Worker exiting.");
    completed
  }
}
