//! Ordered outcome assembly

use tracing::warn;

use super::pool::WorkerPoolError;
use crate::task::TaskOutcome;

/// Collects outcomes arriving in completion order into input order
pub struct OutcomeCollector<T> {
    slots: Vec<Option<TaskOutcome<T>>>,
    received: usize,
}

impl<T> OutcomeCollector<T> {
    /// Create a collector with one empty slot per input
    pub fn new(total: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(total).collect(),
            received: 0,
        }
    }

    /// Place an outcome at its input index
    pub fn record(&mut self, index: usize, outcome: TaskOutcome<T>) {
        match self.slots.get_mut(index) {
            Some(slot) => {
                if slot.replace(outcome).is_some() {
                    warn!(index, "Outcome recorded twice, keeping the latest");
                } else {
                    self.received += 1;
                }
            }
            None => warn!(index, total = self.slots.len(), "Outcome index out of range"),
        }
    }

    /// Number of distinct slots filled so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Whether every slot is filled
    pub fn is_complete(&self) -> bool {
        self.received == self.slots.len()
    }

    /// Finish collection, failing on the first slot left empty
    pub fn finish(self) -> Result<Vec<TaskOutcome<T>>, WorkerPoolError> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(WorkerPoolError::MissingOutcome(index)))
            .collect()
    }
}
