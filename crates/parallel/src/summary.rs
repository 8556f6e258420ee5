//! Run summaries
//!
//! Counts successes and failures in an outcome list and picks out the
//! argument tuples worth retrying.

use serde::{Deserialize, Serialize};

use crate::task::TaskOutcome;

/// Success/failure counts for one pool run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of outcomes
    pub total: usize,
    /// Outcomes that returned a value
    pub succeeded: usize,
    /// Outcomes that captured an error
    pub failed: usize,
    /// Input indices of the failed outcomes, ascending
    pub failed_indices: Vec<usize>,
}

impl RunSummary {
    /// Summarize an outcome list
    pub fn from_outcomes<T>(outcomes: &[TaskOutcome<T>]) -> Self {
        let failed_indices: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.is_err().then_some(index))
            .collect();

        Self {
            total: outcomes.len(),
            succeeded: outcomes.len() - failed_indices.len(),
            failed: failed_indices.len(),
            failed_indices,
        }
    }

    /// Whether every task succeeded
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Argument tuples whose outcome failed, in input order
///
/// Feed the result into a new pool to retry only the failures.
pub fn failed_arguments<A: Clone, T>(arguments: &[A], outcomes: &[TaskOutcome<T>]) -> Vec<A> {
    arguments
        .iter()
        .zip(outcomes)
        .filter(|(_, outcome)| outcome.is_err())
        .map(|(args, _)| args.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskError;

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            Ok(1),
            Err(TaskError::failed("x")),
            Ok(3),
            Err(TaskError::panicked("y")),
        ];

        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failed_indices, vec![1, 3]);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_empty_summary_is_success() {
        let summary = RunSummary::from_outcomes::<()>(&[]);
        assert_eq!(summary, RunSummary::default());
        assert!(summary.is_success());
    }

    #[test]
    fn test_failed_arguments_keeps_order() {
        let arguments = vec![(1, "a"), (2, "b"), (3, "c"), (2, "b")];
        let outcomes = vec![
            Ok(()),
            Err(TaskError::failed("bad")),
            Ok(()),
            Err(TaskError::failed("bad")),
        ];

        assert_eq!(
            failed_arguments(&arguments, &outcomes),
            vec![(2, "b"), (2, "b")]
        );
    }
}
