//! Pending action queue: highest priority first, FIFO among equals.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use loopmod_types::ParameterValue;

use crate::definitions::ActionDefinition;

/// An accepted trigger waiting to execute. Holds the definition it was
/// accepted against, even if a reload replaces it in the meantime.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub action: Arc<ActionDefinition>,
    /// Merged and resolved payload
    pub payload: ParameterValue,
    pub sequence: u64,
}

impl PartialEq for PendingAction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingAction {}

impl PartialOrd for PendingAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingAction {
    // Max-heap order: higher priority, then earlier sequence
    fn cmp(&self, other: &Self) -> Ordering {
        self.action
            .priority
            .cmp(&other.action.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
pub struct PendingQueue {
    heap: BinaryHeap<PendingAction>,
    next_sequence: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Arc<ActionDefinition>, payload: ParameterValue) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(PendingAction {
            action,
            payload,
            sequence,
        });
    }

    pub fn pop(&mut self) -> Option<PendingAction> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop everything, returning how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }
}
