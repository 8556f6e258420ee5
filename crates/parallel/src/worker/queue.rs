//! Shared claim queue
//!
//! Workers pull the next unclaimed argument tuple when idle instead of
//! receiving a fixed chunk up front.

use parking_lot::Mutex;

/// Argument tuples tagged with their input index, claimed one at a time
pub struct WorkQueue<A> {
    items: Mutex<std::iter::Enumerate<std::vec::IntoIter<A>>>,
    total: usize,
}

impl<A> WorkQueue<A> {
    /// Create a queue over the argument list
    pub fn new(arguments: Vec<A>) -> Self {
        let total = arguments.len();
        Self {
            items: Mutex::new(arguments.into_iter().enumerate()),
            total,
        }
    }

    /// Claim the next argument tuple together with its input index
    pub fn claim(&self) -> Option<(usize, A)> {
        self.items.lock().next()
    }

    /// Number of tuples not yet claimed
    pub fn remaining(&self) -> usize {
        self.items.lock().len()
    }

    /// Number of tuples the queue started with
    pub fn total(&self) -> usize {
        self.total
    }
}
