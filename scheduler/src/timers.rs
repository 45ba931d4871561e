//! Deferred work keyed by wall-clock due time.
//!
//! One min-heap drives every delayed sample, so clearing all pending work on
//! disconnect is a single call. Tasks due at the same instant run in the
//! order they were scheduled.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    SampleEntry,
    SampleClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub due_ms: u64,
    pub op_id: u64,
    pub kind: TaskKind,
    seq: u64,
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<ScheduledTask>>,
    seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, op_id: u64, kind: TaskKind) {
        self.seq += 1;
        self.heap.push(Reverse(ScheduledTask {
            due_ms,
            op_id,
            kind,
            seq: self.seq,
        }));
    }

    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(t)| t.due_ms)
    }

    /// Pops the earliest task if it is due at `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<ScheduledTask> {
        if self.next_due()? > now_ms {
            return None;
        }
        self.heap.pop().map(|Reverse(t)| t)
    }

    /// Drops every pending task and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.heap.len();
        self.heap.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
