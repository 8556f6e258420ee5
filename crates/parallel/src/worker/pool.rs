//! Worker pool for task execution
//!
//! Runs a task over an argument list on a fixed number of worker threads and
//! reassembles the outcomes in input order.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

use super::collector::OutcomeCollector;
use super::queue::WorkQueue;
use crate::summary::RunSummary;
use crate::task::{panic_message, TaskOutcome, TaskWrapper};

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Name used in logs and worker thread names
    pub pool_name: String,

    /// Number of worker threads (must be at least 1)
    pub worker_count: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            pool_name: format!("pool-{}", Uuid::now_v7()),
            worker_count: num_cpus::get(),
        }
    }
}

impl WorkerPoolConfig {
    /// Create a configuration with the given worker count
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SLIM_POOL_NAME`: Pool name (default: `pool-<uuid>`)
    /// - `SLIM_POOL_WORKERS`: Worker count (default: number of CPUs)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let pool_name = std::env::var("SLIM_POOL_NAME").unwrap_or(defaults.pool_name);

        let worker_count = std::env::var("SLIM_POOL_WORKERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.worker_count);

        Self {
            pool_name,
            worker_count,
        }
    }

    /// Set the pool name
    pub fn with_pool_name(mut self, name: impl Into<String>) -> Self {
        self.pool_name = name.into();
        self
    }

    /// Set the worker count
    ///
    /// Not clamped; a zero count is rejected by [`validate`](Self::validate).
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), WorkerPoolError> {
        if self.worker_count == 0 {
            return Err(WorkerPoolError::InvalidWorkerCount(self.worker_count));
        }
        Ok(())
    }
}

/// Worker pool errors
///
/// These are faults of the pool itself. Task failures never show up here;
/// they are returned as `Err(TaskError)` entries in the outcome list.
#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    /// Worker count was zero
    #[error("invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),

    /// Blocking start called from inside an async runtime
    #[error("start() cannot block inside an async runtime; use run().await instead")]
    NestedRuntime,

    /// Runtime for the blocking entry point could not be built
    #[error("failed to build worker runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// A worker thread died outside of task code
    #[error("worker {worker} crashed: {reason}")]
    WorkerCrashed { worker: usize, reason: String },

    /// An input index finished the run without an outcome
    #[error("no outcome recorded for argument index {0}")]
    MissingOutcome(usize),
}

/// Runs one task over many argument tuples with bounded parallelism
///
/// The pool is consumed by [`start`](Self::start) or [`run`](Self::run), so a
/// given instance executes at most once.
///
/// # Example
///
/// ```
/// use slim_parallel::{TaskError, TaskWrapper, WorkerPool};
///
/// let task = TaskWrapper::new(|(a, b): (i64, String)| {
///     if a == 2 {
///         return Err(TaskError::failed("bad"));
///     }
///     Ok(a + b.len() as i64)
/// });
/// let arguments = vec![(1, "a".to_string()), (2, "b".to_string()), (3, "c".to_string())];
///
/// let outcomes = WorkerPool::new(task, arguments, 2).unwrap().start().unwrap();
/// assert_eq!(outcomes[0], Ok(2));
/// assert_eq!(outcomes[1], Err(TaskError::failed("bad")));
/// assert_eq!(outcomes[2], Ok(4));
/// ```
pub struct WorkerPool<A, T> {
    task: TaskWrapper<A, T>,
    arguments: Vec<A>,
    config: WorkerPoolConfig,
}

impl<A, T> WorkerPool<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    /// Create a pool with `worker_count` workers
    pub fn new(
        task: TaskWrapper<A, T>,
        arguments: impl IntoIterator<Item = A>,
        worker_count: usize,
    ) -> Result<Self, WorkerPoolError> {
        Self::with_config(task, arguments, WorkerPoolConfig::new(worker_count))
    }

    /// Create a pool from a full configuration
    pub fn with_config(
        task: TaskWrapper<A, T>,
        arguments: impl IntoIterator<Item = A>,
        config: WorkerPoolConfig,
    ) -> Result<Self, WorkerPoolError> {
        config.validate()?;
        Ok(Self {
            task,
            arguments: arguments.into_iter().collect(),
            config,
        })
    }

    /// Number of argument tuples (and of outcomes a run will return)
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    /// Whether the argument list is empty
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Get the configuration
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Workers actually spawned for a run: never more than there are tasks
    pub fn effective_workers(&self) -> usize {
        self.config.worker_count.min(self.arguments.len())
    }

    /// Run every task and block until all of them finished
    ///
    /// Builds a private runtime for the duration of the call. Any thread that
    /// belongs to a tokio runtime gets [`WorkerPoolError::NestedRuntime`],
    /// including threads of its blocking pool. Pool workers are such threads,
    /// so a task cannot call `start` on another pool; async callers use
    /// [`run`](Self::run), and nested fan-out should go to a pool started
    /// from a plain thread.
    pub fn start(self) -> Result<Vec<TaskOutcome<T>>, WorkerPoolError> {
        if self.arguments.is_empty() {
            debug!(pool = %self.config.pool_name, "Empty argument list, nothing to run");
            return Ok(Vec::new());
        }

        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(WorkerPoolError::NestedRuntime);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name(format!("{}-worker", self.config.pool_name))
            .max_blocking_threads(self.effective_workers())
            .build()?;

        runtime.block_on(self.run())
    }

    /// Run every task and wait for all of them to finish
    ///
    /// Returns exactly one outcome per argument tuple, at the tuple's index.
    /// All workers are joined before this returns, on success and on fault.
    #[instrument(
        skip(self),
        fields(pool = %self.config.pool_name, task = %self.task.name(), tasks = self.arguments.len())
    )]
    pub async fn run(self) -> Result<Vec<TaskOutcome<T>>, WorkerPoolError> {
        let total = self.arguments.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.effective_workers();
        let started = Instant::now();
        info!(workers, "Starting worker pool run");

        let queue = Arc::new(WorkQueue::new(self.arguments));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let handles: Vec<JoinHandle<usize>> = (0..workers)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let task = self.task.clone();
                let results_tx = results_tx.clone();
                let span = Span::current();

                tokio::task::spawn_blocking(move || {
                    let _entered = span.enter();
                    worker_loop(worker, &queue, &task, &results_tx)
                })
            })
            .collect();

        // Channel closes once every worker has dropped its sender
        drop(results_tx);

        let mut collector = OutcomeCollector::new(total);
        while let Some((index, outcome)) = results_rx.recv().await {
            collector.record(index, outcome);
        }

        let mut fault = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(completed) => debug!(worker, completed, "Worker joined"),
                Err(e) => {
                    let reason = if e.is_panic() {
                        panic_message(e.into_panic().as_ref())
                    } else {
                        e.to_string()
                    };
                    error!(worker, %reason, "Worker crashed");
                    fault.get_or_insert(WorkerPoolError::WorkerCrashed { worker, reason });
                }
            }
        }

        if let Some(fault) = fault {
            return Err(fault);
        }

        if !collector.is_complete() {
            warn!(
                received = collector.received(),
                expected = total,
                "Run finished with missing outcomes"
            );
        }
        let outcomes = collector.finish()?;

        let summary = RunSummary::from_outcomes(&outcomes);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Worker pool run finished"
        );

        Ok(outcomes)
    }
}

/// Claim and run tasks until the queue is drained
///
/// Returns the number of tasks this worker completed.
fn worker_loop<A, T>(
    worker: usize,
    queue: &WorkQueue<A>,
    task: &TaskWrapper<A, T>,
    results: &mpsc::UnboundedSender<(usize, TaskOutcome<T>)>,
) -> usize {
    debug!(worker, "Worker started");
    let mut completed = 0;

    while let Some((index, args)) = queue.claim() {
        let outcome = task.run(args);
        if let Err(e) = &outcome {
            warn!(worker, index, error = %e, "Task failed");
        }

        if results.send((index, outcome)).is_err() {
            warn!(worker, "Result channel closed, stopping worker");
            break;
        }
        completed += 1;
    }

    debug!(worker, completed, "Worker finished");
    completed
}
