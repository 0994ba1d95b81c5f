//! # External Event Queue
//!
//! Serializes eventIn writes from external threads into the engine's
//! event cycle.
//!
//! ```text
//!   EventIn ──post──▶ [ events (FIFO) | last event per target ] ──drain──▶ node
//! ```
//!
//! The per-target index makes set1Value coalescing O(1): a delta looks up
//! the most recent queued event of its target and merges into it while the
//! queue lock is held. `drain` empties both in one step, so a dequeued
//! event can never be merged into.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use eai_core::FieldError;

use super::{FieldTarget, PendingInput};
use crate::error::{EaiError, EaiResult};

/// Outcome of one [`ExternalEventQueue::drain`].
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Events written to their node.
    pub applied: usize,
    /// Deltas merged into an already queued event since the last drain.
    pub conglomerated: usize,
    /// Events that failed, with their target.
    pub failures: Vec<(FieldTarget, FieldError)>,
    /// True if an open update batch held the events back.
    pub deferred: bool,
}

impl DrainReport {
    /// Returns true if every drained event was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Queue contents, guarded by one lock.
#[derive(Default)]
pub(crate) struct QueueState {
    events: Vec<Arc<PendingInput>>,
    last: HashMap<FieldTarget, Arc<PendingInput>>,
    update_depth: usize,
    conglomerated: usize,
    closed: bool,
}

/// Locked view of the queue for check-and-merge sequences.
pub(crate) struct QueueGuard<'a>(MutexGuard<'a, QueueState>);

impl QueueGuard<'_> {
    pub(crate) fn ensure_open(&self) -> EaiResult<()> {
        if self.0.closed {
            return Err(EaiError::Disposed);
        }
        Ok(())
    }

    pub(crate) fn last_for(&self, target: &FieldTarget) -> Option<&Arc<PendingInput>> {
        self.0.last.get(target)
    }

    pub(crate) fn note_conglomerated(&mut self) {
        self.0.conglomerated += 1;
    }

    pub(crate) fn push(&mut self, event: Arc<PendingInput>) {
        event.set_queued(true);
        self.0.last.insert(event.target().clone(), Arc::clone(&event));
        self.0.events.push(event);
    }
}

/// Pending eventIn writes, applied in FIFO order by [`drain`](Self::drain).
#[derive(Default)]
pub struct ExternalEventQueue {
    state: Mutex<QueueState>,
}

impl ExternalEventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> QueueGuard<'_> {
        QueueGuard(self.state.lock())
    }

    /// Queues an event.
    ///
    /// # Errors
    ///
    /// `Disposed` once the queue is closed.
    pub fn post(&self, event: Arc<PendingInput>) -> EaiResult<()> {
        let mut queue = self.lock();
        queue.ensure_open()?;
        queue.push(event);
        Ok(())
    }

    /// Most recent queued event for `target`.
    #[must_use]
    pub fn last_for(&self, target: &FieldTarget) -> Option<Arc<PendingInput>> {
        self.lock().last_for(target).cloned()
    }

    /// Opens an update batch. Batches nest.
    pub fn begin_update(&self) {
        let mut state = self.state.lock();
        state.update_depth += 1;
        tracing::trace!("Update batch opened, depth {}", state.update_depth);
    }

    /// Closes an update batch.
    ///
    /// # Returns
    ///
    /// `true` if this closed the outermost batch.
    pub fn end_update(&self) -> bool {
        let mut state = self.state.lock();
        if state.update_depth == 0 {
            tracing::warn!("end_update without matching begin_update");
            return false;
        }
        state.update_depth -= 1;
        state.update_depth == 0
    }

    /// Whether an update batch is open.
    #[must_use]
    pub fn in_update(&self) -> bool {
        self.state.lock().update_depth > 0
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Applies every queued event in FIFO order.
    ///
    /// While an update batch is open nothing is applied and the report is
    /// marked deferred. Failures are logged and collected; the remaining
    /// events are still applied.
    pub fn drain(&self) -> DrainReport {
        let (events, conglomerated) = {
            let mut state = self.state.lock();
            if state.update_depth > 0 {
                return DrainReport {
                    deferred: true,
                    ..DrainReport::default()
                };
            }
            state.last.clear();
            for event in &state.events {
                event.set_queued(false);
            }
            (
                mem::take(&mut state.events),
                mem::take(&mut state.conglomerated),
            )
        };

        let mut report = DrainReport {
            conglomerated,
            ..DrainReport::default()
        };
        for event in events {
            match event.apply() {
                Ok(true) => report.applied += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(
                        "Applying eventIn to {} field {} failed: {}",
                        event.target().node().type_name(),
                        event.target().field(),
                        err
                    );
                    report.failures.push((event.target().clone(), err));
                }
            }
        }
        if report.applied > 0 {
            tracing::trace!("Drained {} eventIn writes", report.applied);
        }
        report
    }

    /// Rejects further posts and discards queued events.
    ///
    /// # Returns
    ///
    /// The number of events discarded.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        state.update_depth = 0;
        state.last.clear();
        let discarded = mem::take(&mut state.events);
        for event in &discarded {
            event.set_queued(false);
        }
        discarded.len()
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
