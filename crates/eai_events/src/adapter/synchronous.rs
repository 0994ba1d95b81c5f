//! # Synchronous Event Adapter
//!
//! Calls listeners inline on the thread that changed the field. Each
//! listener gets a fresh buffer bound to the live field; nothing is
//! snapshotted or pooled.

use std::sync::Arc;

use parking_lot::Mutex;

use eai_core::{FieldChangeListener, FieldError, FieldId, FieldResult, NodeHandle, WeakNodeHandle};

use super::{EventAdapter, ListenerTable};
use crate::clock::Clock;
use crate::output::{EventOutListener, OutputBuffer, OutputEvent};

/// Event adapter that delivers on the caller's thread.
pub struct SynchronousEventAdapter {
    node: WeakNodeHandle,
    table: Mutex<ListenerTable>,
    clock: Arc<dyn Clock>,
}

impl SynchronousEventAdapter {
    /// Creates an adapter for `node`. The caller registers it with the node.
    #[must_use]
    pub fn new(node: &NodeHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            node: node.downgrade(),
            table: Mutex::new(ListenerTable::new(0)),
            clock,
        }
    }
}

impl EventAdapter for SynchronousEventAdapter {
    fn node(&self) -> &WeakNodeHandle {
        &self.node
    }

    fn add_listener(&self, field: FieldId, listener: Arc<dyn EventOutListener>) -> FieldResult<()> {
        let node = self.node.upgrade().ok_or(FieldError::NodeDisposed)?;
        let kind = node.field_declaration(field)?.kind;
        self.table.lock().add(field, kind, listener);
        Ok(())
    }

    fn remove_listener(&self, field: FieldId, listener: &Arc<dyn EventOutListener>) {
        self.table.lock().remove(field, listener);
    }

    fn listener_count(&self, field: FieldId) -> usize {
        self.table.lock().listener_count(field)
    }

    fn pooled_buffer_count(&self, _field: FieldId) -> usize {
        0
    }

    fn generate_broadcast(&self, field: FieldId, timestamp: f64) -> FieldResult<()> {
        // Listeners may add or remove listeners, so never call them locked
        let Some((kind, listeners)) = self.table.lock().snapshot(field) else {
            return Ok(());
        };
        let Some(node) = self.node.upgrade() else {
            return Ok(());
        };

        let user_data = node.user_data(field).map_err(|err| {
            tracing::error!("Reading user data of {} field {} failed: {}", node.type_name(), field, err);
            err
        })?;

        for listener in listeners {
            let buffer = OutputBuffer::bound(node.clone(), field, kind);
            let event = OutputEvent::new(buffer, timestamp, user_data.clone());
            listener.callback(&event);
        }
        Ok(())
    }
}

impl FieldChangeListener for SynchronousEventAdapter {
    fn field_changed(&self, field: FieldId) -> FieldResult<()> {
        self.generate_broadcast(field, self.clock.time())
    }
}
