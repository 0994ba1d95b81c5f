//! # In-Memory Node
//!
//! Reference implementation of the Field Access Facade. Hosts without a
//! scene graph of their own, and the test suites, use it as the live node.
//!
//! Writes notify registered change listeners after every lock has been
//! released, so a listener may read the node it is listening to.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{FieldError, FieldResult};
use crate::field::{AccessType, FieldDeclaration, FieldId, FieldKind, FieldValue};
use crate::node::{same_object, FieldAccess, FieldChangeListener, NodeHandle, UserData};

/// One field slot.
struct FieldSlot {
    /// Current value.
    value: FieldValue,
    /// Host user data.
    user_data: Option<UserData>,
}

/// A node whose fields live in memory.
pub struct MemoryNode {
    /// Node type name.
    type_name: String,
    /// Field declarations, indexed by field id.
    declarations: Vec<FieldDeclaration>,
    /// Field storage, indexed by field id.
    slots: RwLock<Vec<FieldSlot>>,
    /// Node-level change listeners.
    listeners: RwLock<Vec<Arc<dyn FieldChangeListener>>>,
}

impl MemoryNode {
    /// Starts declaring a node of the given type.
    #[must_use]
    pub fn builder(type_name: impl Into<String>) -> MemoryNodeBuilder {
        MemoryNodeBuilder {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Number of registered change listeners.
    #[must_use]
    pub fn change_listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn declaration(&self, field: FieldId) -> FieldResult<&FieldDeclaration> {
        self.declarations
            .get(field.index())
            .ok_or(FieldError::InvalidField(field))
    }
}

impl FieldAccess for MemoryNode {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field_index(&self, name: &str) -> Option<FieldId> {
        self.declarations
            .iter()
            .position(|decl| decl.name == name)
            .and_then(|index| u32::try_from(index).ok())
            .map(FieldId)
    }

    fn field_declaration(&self, field: FieldId) -> FieldResult<FieldDeclaration> {
        self.declaration(field).cloned()
    }

    fn field_value(&self, field: FieldId) -> FieldResult<FieldValue> {
        self.slots
            .read()
            .get(field.index())
            .map(|slot| slot.value.clone())
            .ok_or(FieldError::InvalidField(field))
    }

    fn load_field_value(&self, field: FieldId, target: &mut FieldValue) -> FieldResult<()> {
        let slots = self.slots.read();
        let slot = slots
            .get(field.index())
            .ok_or(FieldError::InvalidField(field))?;
        target.assign_from(&slot.value);
        Ok(())
    }

    fn set_field_value(&self, field: FieldId, value: &FieldValue) -> FieldResult<()> {
        let expected = self.declaration(field)?.kind;
        if value.kind() != expected {
            return Err(FieldError::KindMismatch {
                expected,
                found: value.kind(),
            });
        }

        {
            let mut slots = self.slots.write();
            let slot = slots
                .get_mut(field.index())
                .ok_or(FieldError::InvalidField(field))?;
            slot.value.assign_from(value);
        }

        // Notify outside of every lock
        let listeners = self.listeners.read().clone();
        tracing::trace!(
            "{} field {} changed, notifying {} listeners",
            self.type_name,
            field,
            listeners.len()
        );
        let mut first_error = None;
        for listener in &listeners {
            if let Err(err) = listener.field_changed(field) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn user_data(&self, field: FieldId) -> FieldResult<Option<UserData>> {
        self.slots
            .read()
            .get(field.index())
            .map(|slot| slot.user_data.clone())
            .ok_or(FieldError::InvalidField(field))
    }

    fn set_user_data(&self, field: FieldId, data: Option<UserData>) -> FieldResult<()> {
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(field.index())
            .ok_or(FieldError::InvalidField(field))?;
        slot.user_data = data;
        Ok(())
    }

    fn add_change_listener(&self, listener: Arc<dyn FieldChangeListener>) {
        self.listeners.write().push(listener);
    }

    fn remove_change_listener(&self, listener: &Arc<dyn FieldChangeListener>) {
        self.listeners
            .write()
            .retain(|existing| !same_object(existing, listener));
    }
}

/// Declares the fields of a [`MemoryNode`].
pub struct MemoryNodeBuilder {
    type_name: String,
    fields: Vec<(FieldDeclaration, FieldValue)>,
}

impl MemoryNodeBuilder {
    /// Adds a field with an initial value; the kind is taken from the value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, access: AccessType, value: FieldValue) -> Self {
        let decl = FieldDeclaration::new(name, value.kind(), access);
        self.fields.push((decl, value));
        self
    }

    /// Adds a field holding the default value of `kind`.
    #[must_use]
    pub fn default_field(self, name: impl Into<String>, kind: FieldKind, access: AccessType) -> Self {
        self.field(name, access, kind.default_value())
    }

    /// Finishes the node.
    #[must_use]
    pub fn build_node(self) -> MemoryNode {
        let (declarations, slots) = self
            .fields
            .into_iter()
            .map(|(decl, value)| {
                (
                    decl,
                    FieldSlot {
                        value,
                        user_data: None,
                    },
                )
            })
            .unzip();

        MemoryNode {
            type_name: self.type_name,
            declarations,
            slots: RwLock::new(slots),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Finishes the node and wraps it in a handle.
    #[must_use]
    pub fn build(self) -> NodeHandle {
        NodeHandle::new(self.build_node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl FieldChangeListener for Counter {
        fn field_changed(&self, _field: FieldId) -> FieldResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn material() -> MemoryNode {
        MemoryNode::builder("Material")
            .field(
                "diffuseColor",
                AccessType::ExposedField,
                FieldValue::SfColor([0.8, 0.8, 0.8]),
            )
            .default_field("transparency", FieldKind::SfFloat, AccessType::ExposedField)
            .build_node()
    }

    #[test]
    fn test_field_lookup() {
        let node = material();
        assert_eq!(node.field_index("transparency"), Some(FieldId(1)));
        assert_eq!(node.field_index("shininess"), None);
        assert_eq!(
            node.field_declaration(FieldId(9)).unwrap_err(),
            FieldError::InvalidField(FieldId(9))
        );
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let node = material();
        let err = node
            .set_field_value(FieldId(1), &FieldValue::SfInt32(3))
            .unwrap_err();
        assert_eq!(
            err,
            FieldError::KindMismatch {
                expected: FieldKind::SfFloat,
                found: FieldKind::SfInt32,
            }
        );
    }

    #[test]
    fn test_set_notifies_listeners() {
        let node = material();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let listener: Arc<dyn FieldChangeListener> = counter.clone();
        node.add_change_listener(Arc::clone(&listener));

        node.set_field_value(FieldId(1), &FieldValue::SfFloat(0.5))
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(node.field_value(FieldId(1)).unwrap(), FieldValue::SfFloat(0.5));

        node.remove_change_listener(&listener);
        assert_eq!(node.change_listener_count(), 0);
        node.set_field_value(FieldId(1), &FieldValue::SfFloat(0.25))
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_user_data_round_trip() {
        let node = material();
        let data: UserData = Arc::new(42_u32);
        node.set_user_data(FieldId(0), Some(data)).unwrap();

        let stored = node.user_data(FieldId(0)).unwrap().unwrap();
        assert_eq!(stored.downcast_ref::<u32>(), Some(&42));
    }
}
