//! # Parallel task pool
//!
//! Runs one callable over a list of argument tuples with a fixed number of
//! worker threads and returns one outcome per tuple, in input order.
//!
//! ## Features
//!
//! - **Failure isolation**: returned errors and panics become [`TaskError`] values
//! - **Ordered results**: outcome `i` always belongs to argument tuple `i`
//! - **Pull-based scheduling**: idle workers claim the next unclaimed tuple
//! - **Blocking or async**: [`WorkerPool::start`] blocks, [`WorkerPool::run`] awaits
//!
//! ## Example
//!
//! ```
//! use slim_parallel::prelude::*;
//!
//! let task = TaskWrapper::new(|(a, b): (i64, &'static str)| {
//!     if a == 2 {
//!         return Err(TaskError::failed("bad"));
//!     }
//!     Ok(a + b.len() as i64)
//! });
//!
//! let outcomes = WorkerPool::new(task, vec![(1, "a"), (2, "b"), (3, "c")], 2)?
//!     .start()?;
//!
//! let summary = RunSummary::from_outcomes(&outcomes);
//! assert_eq!(summary.failed_indices, vec![1]);
//! # Ok::<(), WorkerPoolError>(())
//! ```

pub mod summary;
pub mod task;
pub mod worker;

/// Prelude for common imports
pub mod prelude {
    pub use crate::summary::{failed_arguments, RunSummary};
    pub use crate::task::{JsonArguments, TaskError, TaskErrorKind, TaskOutcome, TaskWrapper};
    pub use crate::worker::{WorkerPool, WorkerPoolConfig, WorkerPoolError};
}

// Re-export key types at crate root
pub use summary::{failed_arguments, RunSummary};
pub use task::{JsonArguments, TaskError, TaskErrorKind, TaskOutcome, TaskWrapper};
pub use worker::{WorkerPool, WorkerPoolConfig, WorkerPoolError};
