//! # Buffered Event Adapter
//!
//! Snapshots the field value once per listener and hands delivery to the
//! dispatcher pool. Snapshot buffers come back through
//! [`BufferReclaimer`] and are pooled per field.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use eai_core::{FieldChangeListener, FieldError, FieldId, FieldResult, NodeHandle, WeakNodeHandle};

use super::{BufferReclaimer, EventAdapter, ListenerTable};
use crate::clock::Clock;
use crate::config::DispatchConfig;
use crate::dispatch::EventAdapterThreadPool;
use crate::output::{EventOutListener, OutputBuffer, OutputEvent};

/// Event adapter that delivers on the dispatcher threads.
pub struct BufferedEventAdapter {
    /// Watched node.
    node: WeakNodeHandle,
    /// Field table.
    table: Mutex<ListenerTable>,
    /// Shared dispatcher.
    pool: Arc<EventAdapterThreadPool>,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
    /// Handed to the dispatcher as the reclaimer.
    self_ref: Weak<BufferedEventAdapter>,
    /// Array capacity kept by pooled buffers.
    max_retained: usize,
}

impl BufferedEventAdapter {
    /// Creates an adapter for `node`. The caller registers it with the node.
    #[must_use]
    pub fn new(
        node: &NodeHandle,
        pool: Arc<EventAdapterThreadPool>,
        clock: Arc<dyn Clock>,
        config: &DispatchConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            node: node.downgrade(),
            table: Mutex::new(ListenerTable::new(config.max_pooled_buffers_per_field)),
            pool,
            clock,
            self_ref: self_ref.clone(),
            max_retained: config.max_retained_elements,
        })
    }
}

impl EventAdapter for BufferedEventAdapter {
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
        if self.table.lock().remove(field, listener) {
            tracing::debug!("Last listener removed from field {}, buffer pool released", field);
        }
    }

    fn listener_count(&self, field: FieldId) -> usize {
        self.table.lock().listener_count(field)
    }

    fn pooled_buffer_count(&self, field: FieldId) -> usize {
        self.table.lock().pooled_count(field)
    }

    fn generate_broadcast(&self, field: FieldId, timestamp: f64) -> FieldResult<()> {
        let Some((kind, listeners)) = self.table.lock().snapshot(field) else {
            return Ok(());
        };
        let Some(node) = self.node.upgrade() else {
            return Ok(());
        };
        let Some(reclaimer) = self.self_ref.upgrade() else {
            return Ok(());
        };

        let user_data = node.user_data(field).map_err(|err| {
            tracing::error!("Reading user data of {} field {} failed: {}", node.type_name(), field, err);
            err
        })?;

        for listener in listeners {
            let pooled = self.table.lock().take_buffer(field);
            let mut buffer =
                pooled.unwrap_or_else(|| OutputBuffer::with_retention(kind, self.max_retained));
            buffer.initialize(node.clone(), field);
            if let Err(err) = buffer.load_output_value() {
                tracing::error!("Snapshot of {} field {} failed: {}", node.type_name(), field, err);
                return Err(err);
            }

            let event = OutputEvent::new(buffer, timestamp, user_data.clone());
            let reclaimer: Arc<dyn BufferReclaimer> = reclaimer.clone();
            self.pool.send_event(listener, event, field, reclaimer);
        }
        Ok(())
    }
}

impl FieldChangeListener for BufferedEventAdapter {
    fn field_changed(&self, field: FieldId) -> FieldResult<()> {
        self.generate_broadcast(field, self.clock.time())
    }
}

impl BufferReclaimer for BufferedEventAdapter {
    fn reclaim_event_out_buffer(&self, field: FieldId, mut buffer: OutputBuffer) {
        buffer.reset();
        self.table.lock().return_buffer(field, buffer);
    }
}
