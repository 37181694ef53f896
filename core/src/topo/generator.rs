use super::EntityId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonically increasing source of [`EntityId`]s.
///
/// Clones share the same counter, so a generator can be handed to several
/// owners (or threads) without ever issuing the same id twice.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    counter: Arc<AtomicU64>,
}

impl IdGenerator {
    /// Generator whose first id is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Issue the next id. The read-increment is a single atomic step.
    pub fn next_id(&self) -> EntityId {
        EntityId(self.counter.fetch_add(1, Ordering::SeqCst))
    }

    /// The id the next call to [`IdGenerator::next_id`] would return.
    pub fn peek(&self) -> EntityId {
        EntityId(self.counter.load(Ordering::SeqCst))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
