//! Counters exposed for health reporting.

use serde::{Deserialize, Serialize};

/// Number of task records per status currently held by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub processing: usize,
    pub ready: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.processing + self.ready + self.failed
    }
}
