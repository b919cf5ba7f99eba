// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Virtual clock and timer queue.
//!
//! Time only moves when the host advances it, so delayed work is deterministic.

use core::cmp::{Ordering, Reverse};
use core::time::Duration;
use std::collections::BinaryHeap;

use slim_dom::NodeId;

/// Deferred work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Task {
    /// Broadcast `event` if `origin` is still attached.
    Emit { origin: NodeId, event: String },
    /// Reconnect the live-update socket.
    Reconnect,
}

#[derive(Debug, PartialEq, Eq)]
struct Timer {
    due: Duration,
    seq: u64,
    task: Task,
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Timers ordered by due time, then by scheduling order.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    now: Duration,
    seq: u64,
    timers: BinaryHeap<Reverse<Timer>>,
}

impl Scheduler {
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward. The clock never goes back.
    pub(crate) fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub(crate) fn schedule(&mut self, delay: Duration, task: Task) {
        self.seq += 1;
        self.timers.push(Reverse(Timer {
            due: self.now + delay,
            seq: self.seq,
            task,
        }));
    }

    /// Earliest pending due time.
    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        self.timers.peek().map(|Reverse(t)| t.due)
    }

    /// Pop the next task whose due time has passed.
    pub(crate) fn pop_due(&mut self) -> Option<Task> {
        if self.next_deadline()? > self.now {
            return None;
        }
        self.timers.pop().map(|Reverse(t)| t.task)
    }

    pub(crate) fn has(&self, task: &Task) -> bool {
        self.timers.iter().any(|Reverse(t)| &t.task == task)
    }

    pub(crate) fn len(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn clear(&mut self) {
        self.timers.clear();
    }
}
