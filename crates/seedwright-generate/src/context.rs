use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constraints::ConstraintTracker;
use crate::sequence::SequenceAllocator;

/// Shared flag that aborts a running generation.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the next `generate()` call can run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// State owned by one run and threaded through the resolver.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub seed: String,
    pub constraints: ConstraintTracker,
    pub sequences: SequenceAllocator,
    /// Next top-level index per model; indices continue across `generate()` calls.
    pub next_index: BTreeMap<String, usize>,
    pub cancel: CancelHandle,
}

impl RunContext {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            constraints: ConstraintTracker::new(),
            sequences: SequenceAllocator::new(),
            next_index: BTreeMap::new(),
            cancel: CancelHandle::default(),
        }
    }

    /// Claim `count` consecutive top-level indices for `model`.
    pub fn claim_indices(&mut self, model: &str, count: usize) -> std::ops::Range<usize> {
        let next = self.next_index.entry(model.to_string()).or_insert(0);
        let start = *next;
        *next += count;
        start..*next
    }

    pub fn record_path(&self, model: &str, index: usize) -> String {
        format!("{}/{model}/{index}", self.seed)
    }
}
