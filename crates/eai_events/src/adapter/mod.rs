//! # Event Adapters
//!
//! One adapter per watched node. The adapter registers with the node as its
//! change listener and fans every field change out to the eventOut
//! listeners of that field.
//!
//! ## Architecture
//!
//! ```text
//!  ┌────────┐ field_changed ┌───────────────┐  one buffer per listener
//!  │  Node  │ ────────────▶ │ EventAdapter  │ ───────────────────────▶ listeners
//!  └────────┘               │ field → entry │
//!                           │  listeners    │
//!                           │  buffer pool  │
//!                           └───────────────┘
//! ```
//!
//! [`BufferedEventAdapter`] snapshots the value and hands delivery to the
//! dispatcher threads. [`SynchronousEventAdapter`] calls listeners inline
//! with a live view.

mod buffered;
mod synchronous;

pub use buffered::BufferedEventAdapter;
pub use synchronous::SynchronousEventAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use eai_core::{
    same_object, BufferPool, FieldChangeListener, FieldId, FieldKind, FieldResult, WeakNodeHandle,
};

use crate::output::{EventOutListener, OutputBuffer};

/// Per-node eventOut fan-out.
pub trait EventAdapter: FieldChangeListener {
    /// The watched node.
    fn node(&self) -> &WeakNodeHandle;

    /// Registers a listener for one field. Registering the same listener
    /// twice for a field has no effect.
    ///
    /// # Errors
    ///
    /// `NodeDisposed` if the node is gone, `InvalidField` for an unknown
    /// field id.
    fn add_listener(&self, field: FieldId, listener: Arc<dyn EventOutListener>) -> FieldResult<()>;

    /// Removes a listener by identity. Removing the last listener of a
    /// field releases the field's buffer pool.
    fn remove_listener(&self, field: FieldId, listener: &Arc<dyn EventOutListener>);

    /// Number of listeners registered for `field`.
    fn listener_count(&self, field: FieldId) -> usize;

    /// Number of idle snapshot buffers pooled for `field`.
    fn pooled_buffer_count(&self, field: FieldId) -> usize;

    /// Notifies every listener of `field`.
    ///
    /// A field without listeners returns without allocating. A disposed
    /// node makes this a no-op.
    ///
    /// # Errors
    ///
    /// Field access failures while reading user data or loading snapshots.
    fn generate_broadcast(&self, field: FieldId, timestamp: f64) -> FieldResult<()>;
}

/// Takes snapshot buffers back once a listener is done with them.
pub trait BufferReclaimer: Send + Sync {
    /// `buffer` was delivered for `field` and is no longer read.
    fn reclaim_event_out_buffer(&self, field: FieldId, buffer: OutputBuffer);
}

/// Listeners and idle buffers of one field.
struct FieldEntry {
    kind: FieldKind,
    listeners: Vec<Arc<dyn EventOutListener>>,
    pool: BufferPool<OutputBuffer>,
}

/// Field table shared by both adapter kinds.
pub(crate) struct ListenerTable {
    entries: HashMap<FieldId, FieldEntry>,
    max_pooled: usize,
}

impl ListenerTable {
    pub(crate) fn new(max_pooled: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_pooled,
        }
    }

    pub(crate) fn add(&mut self, field: FieldId, kind: FieldKind, listener: Arc<dyn EventOutListener>) {
        let max_pooled = self.max_pooled;
        let entry = self.entries.entry(field).or_insert_with(|| FieldEntry {
            kind,
            listeners: Vec::new(),
            pool: BufferPool::new(max_pooled),
        });
        if !entry.listeners.iter().any(|l| same_object(l, &listener)) {
            entry.listeners.push(listener);
        }
    }

    /// Returns true if the field lost its last listener.
    pub(crate) fn remove(&mut self, field: FieldId, listener: &Arc<dyn EventOutListener>) -> bool {
        let Some(entry) = self.entries.get_mut(&field) else {
            return false;
        };
        entry.listeners.retain(|l| !same_object(l, listener));
        if entry.listeners.is_empty() {
            // Drops the pooled buffers with the entry
            self.entries.remove(&field);
            return true;
        }
        false
    }

    /// Declared kind and a copy of the listener list.
    pub(crate) fn snapshot(&self, field: FieldId) -> Option<(FieldKind, Vec<Arc<dyn EventOutListener>>)> {
        self.entries
            .get(&field)
            .map(|entry| (entry.kind, entry.listeners.clone()))
    }

    pub(crate) fn take_buffer(&mut self, field: FieldId) -> Option<OutputBuffer> {
        self.entries.get_mut(&field)?.pool.acquire()
    }

    /// Pools a reset buffer. Returns false if it was dropped instead.
    pub(crate) fn return_buffer(&mut self, field: FieldId, buffer: OutputBuffer) -> bool {
        match self.entries.get_mut(&field) {
            Some(entry) if entry.kind == buffer.kind() => entry.pool.release(buffer),
            _ => false,
        }
    }

    pub(crate) fn listener_count(&self, field: FieldId) -> usize {
        self.entries.get(&field).map_or(0, |entry| entry.listeners.len())
    }

    pub(crate) fn pooled_count(&self, field: FieldId) -> usize {
        self.entries.get(&field).map_or(0, |entry| entry.pool.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputEvent;

    fn listener() -> Arc<dyn EventOutListener> {
        Arc::new(|_: &OutputEvent| {})
    }

    #[test]
    fn test_add_is_idempotent_per_identity() {
        let mut table = ListenerTable::new(4);
        let a = listener();
        table.add(FieldId(0), FieldKind::SfFloat, Arc::clone(&a));
        table.add(FieldId(0), FieldKind::SfFloat, Arc::clone(&a));
        table.add(FieldId(0), FieldKind::SfFloat, listener());

        assert_eq!(table.listener_count(FieldId(0)), 2);
        assert_eq!(table.listener_count(FieldId(1)), 0);
    }

    #[test]
    fn test_last_removal_drops_pool() {
        let mut table = ListenerTable::new(4);
        let a = listener();
        let b = listener();
        table.add(FieldId(3), FieldKind::MfInt32, Arc::clone(&a));
        table.add(FieldId(3), FieldKind::MfInt32, Arc::clone(&b));
        assert!(table.return_buffer(FieldId(3), OutputBuffer::new(FieldKind::MfInt32)));
        assert_eq!(table.pooled_count(FieldId(3)), 1);

        assert!(!table.remove(FieldId(3), &a));
        assert_eq!(table.pooled_count(FieldId(3)), 1);

        assert!(table.remove(FieldId(3), &b));
        assert_eq!(table.pooled_count(FieldId(3)), 0);
        assert!(table.snapshot(FieldId(3)).is_none());
    }

    #[test]
    fn test_pool_is_bounded() {
        let mut table = ListenerTable::new(1);
        table.add(FieldId(0), FieldKind::SfBool, listener());

        assert!(table.return_buffer(FieldId(0), OutputBuffer::new(FieldKind::SfBool)));
        assert!(!table.return_buffer(FieldId(0), OutputBuffer::new(FieldKind::SfBool)));
        assert!(table.take_buffer(FieldId(0)).is_some());
        assert!(table.take_buffer(FieldId(0)).is_none());
    }

    #[test]
    fn test_buffer_for_unwatched_field_is_dropped() {
        let mut table = ListenerTable::new(4);
        assert!(!table.return_buffer(FieldId(9), OutputBuffer::new(FieldKind::SfBool)));
    }
}
