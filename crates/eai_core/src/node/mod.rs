//! # Field Access Facade
//!
//! The scene graph is an external collaborator. The EAI layer reaches it
//! only through [`FieldAccess`]: read a field by id, read its declaration,
//! write it, read its user data and register a node-level change listener.
//!
//! ## Ownership
//!
//! ```text
//!  ┌────────────┐  change listeners (strong)  ┌──────────────┐
//!  │    Node    │ ─────────────────────────▶ │ EventAdapter │
//!  │ (scene)    │ ◀───────────────────────── │              │
//!  └────────────┘       WeakNodeHandle       └──────────────┘
//! ```
//!
//! Nodes are owned by the host scene graph. Anything in the EAI layer that
//! the node itself keeps alive holds a [`WeakNodeHandle`] back to it.

mod memory;

pub use memory::{MemoryNode, MemoryNodeBuilder};

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::error::FieldResult;
use crate::field::{FieldDeclaration, FieldId, FieldValue};

/// Opaque per-field user data attached by the host.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Receives field-change notifications from a node.
///
/// The scene graph calls this on its event-propagation thread after a field
/// took a new value.
pub trait FieldChangeListener: Send + Sync {
    /// Field `field` changed value.
    ///
    /// # Errors
    ///
    /// Field access failures while reacting to the change. They indicate a
    /// broken registration and are not retried.
    fn field_changed(&self, field: FieldId) -> FieldResult<()>;
}

/// Field access capability of a live scene-graph node.
pub trait FieldAccess: Send + Sync {
    /// Node type name, for diagnostics.
    fn type_name(&self) -> &str;

    /// Looks up a field id by name.
    fn field_index(&self, name: &str) -> Option<FieldId>;

    /// Returns the declaration of a field.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id.
    fn field_declaration(&self, field: FieldId) -> FieldResult<FieldDeclaration>;

    /// Returns a copy of the current field value.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id.
    fn field_value(&self, field: FieldId) -> FieldResult<FieldValue>;

    /// Copies the current field value into `target`, reusing its storage.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id.
    fn load_field_value(&self, field: FieldId, target: &mut FieldValue) -> FieldResult<()> {
        let value = self.field_value(field)?;
        *target = value;
        Ok(())
    }

    /// Writes a new field value and notifies change listeners.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id, `KindMismatch` for a value of the
    /// wrong kind, or any error raised by a change listener.
    fn set_field_value(&self, field: FieldId, value: &FieldValue) -> FieldResult<()>;

    /// Returns the user data attached to a field.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id.
    fn user_data(&self, field: FieldId) -> FieldResult<Option<UserData>>;

    /// Attaches user data to a field.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id.
    fn set_user_data(&self, field: FieldId, data: Option<UserData>) -> FieldResult<()>;

    /// Registers a node-level change listener.
    fn add_change_listener(&self, listener: Arc<dyn FieldChangeListener>);

    /// Removes a change listener by identity.
    fn remove_change_listener(&self, listener: &Arc<dyn FieldChangeListener>);
}

/// Stable identity of a node, derived from its allocation address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node@{:#x}", self.0)
    }
}

/// Shared, identity-compared reference to a live node.
#[derive(Clone)]
pub struct NodeHandle(Arc<dyn FieldAccess>);

impl NodeHandle {
    /// Wraps a node.
    #[must_use]
    pub fn new<N: FieldAccess + 'static>(node: N) -> Self {
        Self(Arc::new(node))
    }

    /// Wraps an already shared node.
    #[must_use]
    pub fn from_arc(node: Arc<dyn FieldAccess>) -> Self {
        Self(node)
    }

    /// Identity of the node.
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0).cast::<()>() as usize)
    }

    /// Non-owning reference to the same node.
    #[must_use]
    pub fn downgrade(&self) -> WeakNodeHandle {
        WeakNodeHandle {
            id: self.id(),
            node: Arc::downgrade(&self.0),
        }
    }

    /// Number of strong references, for diagnostics.
    #[must_use]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl std::ops::Deref for NodeHandle {
    type Target = dyn FieldAccess;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for NodeHandle {}

impl Hash for NodeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id())
            .field("type", &self.0.type_name())
            .finish()
    }
}

/// Non-owning reference to a node.
#[derive(Clone)]
pub struct WeakNodeHandle {
    id: NodeId,
    node: Weak<dyn FieldAccess>,
}

impl WeakNodeHandle {
    /// Identity of the referenced node.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<NodeHandle> {
        self.node.upgrade().map(NodeHandle)
    }

    /// Returns true once the node has been dropped.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.node.strong_count() == 0
    }

    /// Whether this refers to exactly `node`.
    #[must_use]
    pub fn refers_to(&self, node: &NodeHandle) -> bool {
        self.id == node.id() && !self.is_disposed()
    }
}

impl fmt::Debug for WeakNodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNodeHandle")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Identity comparison for shared trait objects (data pointer only).
#[inline]
#[must_use]
pub fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{AccessType, FieldKind};

    fn node() -> NodeHandle {
        MemoryNode::builder("Transform")
            .field(
                "translation",
                AccessType::ExposedField,
                FieldValue::SfVec3f([0.0; 3]),
            )
            .build()
    }

    #[test]
    fn test_identity_equality() {
        let a = node();
        let b = node();
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(a.id(), a2.id());
    }

    #[test]
    fn test_weak_handle_tracks_lifetime() {
        let a = node();
        let weak = a.downgrade();

        assert!(weak.refers_to(&a));
        assert_eq!(weak.upgrade().unwrap(), a);

        drop(a);
        assert!(weak.is_disposed());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_deref_reaches_facade() {
        let a = node();
        let id = a.field_index("translation").unwrap();
        assert_eq!(a.field_declaration(id).unwrap().kind, FieldKind::SfVec3f);
        assert_eq!(a.type_name(), "Transform");
    }
}
