//! Worker pool for task execution
//!
//! This module provides:
//! - [`WorkerPool`] - Runs a [`TaskWrapper`](crate::TaskWrapper) over an argument list
//! - [`WorkerPoolConfig`] - Worker count and pool naming
//! - [`WorkerPoolError`] - Pool-level faults, distinct from per-task failures
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       WorkerPool                             │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │            WorkQueue  [(0, a0) (1, a1) ...]          │    │
//! │  └──────┬──────────────────┬──────────────────┬────────┘    │
//! │         │ claim            │ claim            │ claim       │
//! │         ▼                  ▼                  ▼             │
//! │   [worker 0]          [worker 1]   ...   [worker W-1]       │
//! │         │                  │                  │             │
//! │         └──── (index, outcome) over mpsc ─────┘             │
//! │                            │                                │
//! │                            ▼                                │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │        OutcomeCollector (slot per input index)       │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use slim_parallel::{TaskWrapper, WorkerPool};
//!
//! let task = TaskWrapper::infallible(|(a, b): (i64, &'static str)| a + b.len() as i64);
//! let pool = WorkerPool::new(task, vec![(1, "a"), (2, "bb"), (3, "ccc")], 2).unwrap();
//!
//! let outcomes = pool.start().unwrap();
//! assert_eq!(outcomes, vec![Ok(2), Ok(4), Ok(6)]);
//! ```

mod collector;
mod pool;
mod queue;

pub use collector::OutcomeCollector;
pub use pool::{WorkerPool, WorkerPoolConfig, WorkerPoolError};
pub use queue::WorkQueue;
