// ── Batch partitioner ──

use serde::Serialize;

use crate::error::CoreError;
use crate::model::WorkItem;

/// An ordered, capacity-bounded slice of the work-item sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// Zero-based position of this batch in the run.
    pub index: usize,
    pub items: Vec<WorkItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split `items` into consecutive batches of `capacity`, the last one
/// holding the remainder. Empty input gives no batches at all.
pub fn partition(items: Vec<WorkItem>, capacity: usize) -> Result<Vec<Batch>, CoreError> {
    if capacity == 0 {
        return Err(CoreError::invalid_configuration(
            "batch size must be at least 1",
        ));
    }

    let mut batches = Vec::with_capacity(items.len().div_ceil(capacity));
    let mut remaining = items.into_iter().peekable();

    while remaining.peek().is_some() {
        let chunk: Vec<WorkItem> = remaining.by_ref().take(capacity).collect();
        batches.push(Batch {
            index: batches.len(),
            items: chunk,
        });
    }

    Ok(batches)
}
