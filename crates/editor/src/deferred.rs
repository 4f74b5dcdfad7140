use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredTask {
    /// Reconcile the toolbar and mirror the content.
    Resync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deferred {
    pub delay_ms: u64,
    pub task: DeferredTask,
}

/// Work scheduled for the next macrotask tick. The host decides when the
/// tick happens; entries drain in the order they were scheduled.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    entries: VecDeque<Deferred>,
}

impl DeferredQueue {
    pub fn schedule(&mut self, delay_ms: u64, task: DeferredTask) {
        self.entries.push_back(Deferred { delay_ms, task });
    }

    pub fn drain(&mut self) -> Vec<Deferred> {
        self.entries.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Deferred> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
