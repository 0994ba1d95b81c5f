//! # EventOut Handle
//!
//! Read handle for one node field, plus listener registration routed
//! through the adapter factory.

use std::fmt;
use std::sync::Arc;

use eai_core::{FieldElement, FieldError, FieldId, FieldKind, FieldResult, FieldValue, NodeHandle};

use super::{EventOutListener, OutputBuffer};
use crate::error::EaiResult;
use crate::factory::EventAdapterFactory;

/// Read handle for one node field.
///
/// A live handle reads the current field value on every access. A stored
/// handle serves the value captured when it was created.
pub struct EventOut {
    buffer: OutputBuffer,
    node: NodeHandle,
    field: FieldId,
    adapters: Arc<EventAdapterFactory>,
}

impl EventOut {
    /// Creates a live read handle for a readable field.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id, `AccessDenied` if the field is not
    /// an eventOut or exposedField.
    pub fn live(
        node: NodeHandle,
        field: FieldId,
        adapters: Arc<EventAdapterFactory>,
    ) -> FieldResult<Self> {
        let decl = node.field_declaration(field)?;
        if !decl.access.is_readable() {
            return Err(FieldError::AccessDenied {
                access: decl.access,
                operation: "eventOut reads",
            });
        }
        let buffer = OutputBuffer::bound(node.clone(), field, decl.kind);
        Ok(Self {
            buffer,
            node,
            field,
            adapters,
        })
    }

    /// Creates a handle holding a snapshot of the current value.
    ///
    /// # Errors
    ///
    /// As [`live`](Self::live), plus any failure reading the value.
    pub fn stored(
        node: NodeHandle,
        field: FieldId,
        adapters: Arc<EventAdapterFactory>,
    ) -> FieldResult<Self> {
        let mut handle = Self::live(node, field, adapters)?;
        handle.buffer.load_output_value()?;
        Ok(handle)
    }

    /// Source node.
    #[must_use]
    pub const fn node(&self) -> &NodeHandle {
        &self.node
    }

    /// Source field.
    #[must_use]
    pub const fn field(&self) -> FieldId {
        self.field
    }

    /// Declared kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.buffer.kind()
    }

    /// Whether this handle serves a snapshot.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        self.buffer.is_loaded()
    }

    /// Element count. Single-value kinds report 1.
    ///
    /// # Errors
    ///
    /// A facade error for a live read.
    pub fn size(&self) -> FieldResult<usize> {
        self.buffer.size()
    }

    /// One element of a multi-value field.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` past the end, `NotMultiValued` for SF kinds.
    pub fn get1_value(&self, index: usize) -> FieldResult<FieldElement> {
        self.buffer.get1_value(index)
    }

    /// A copy of the whole value.
    ///
    /// # Errors
    ///
    /// A facade error for a live read.
    pub fn value(&self) -> FieldResult<FieldValue> {
        self.buffer.value()
    }

    /// Registers a change listener for this field.
    ///
    /// # Errors
    ///
    /// `NodeDisposed` or `InvalidField` from the adapter.
    pub fn add_listener(&self, listener: Arc<dyn EventOutListener>) -> EaiResult<()> {
        self.adapters
            .get_adapter(&self.node)
            .add_listener(self.field, listener)?;
        Ok(())
    }

    /// Removes a change listener by identity.
    pub fn remove_listener(&self, listener: &Arc<dyn EventOutListener>) {
        self.adapters
            .get_adapter(&self.node)
            .remove_listener(self.field, listener);
    }

    /// Number of listeners registered for this field.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.adapters
            .get_adapter(&self.node)
            .listener_count(self.field)
    }
}

impl fmt::Debug for EventOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOut")
            .field("node", &self.node)
            .field("field", &self.field)
            .field("kind", &self.kind())
            .field("stored", &self.is_stored())
            .finish()
    }
}
