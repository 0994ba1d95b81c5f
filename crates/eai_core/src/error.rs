//! # Field Error Types
//!
//! All errors that can occur while reading or writing node fields.

use thiserror::Error;

use crate::field::{AccessType, FieldId, FieldKind};

/// Errors that can occur when accessing fields through the facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field id does not name a field slot on the node.
    #[error("invalid field id {0}")]
    InvalidField(FieldId),

    /// No field with this name exists on the node.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// Index outside of the current multi-value array.
    #[error("index {index} out of bounds for field of size {size}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The current element count.
        size: usize,
    },

    /// A whole value of the wrong kind was offered to a field.
    #[error("value of kind {found} cannot be stored in a field of kind {expected}")]
    KindMismatch {
        /// The declared field kind.
        expected: FieldKind,
        /// The kind of the offered value.
        found: FieldKind,
    },

    /// A single element of the wrong type was offered to a multi-value field.
    #[error("element of type {found} cannot be stored in a field of kind {expected}")]
    ElementMismatch {
        /// The declared field kind.
        expected: FieldKind,
        /// Name of the offered element type.
        found: &'static str,
    },

    /// An indexed operation was used on a single-value field.
    #[error("field of kind {0} is not multi-valued")]
    NotMultiValued(FieldKind),

    /// The field access kind does not permit the operation.
    #[error("{access} field does not permit {operation}")]
    AccessDenied {
        /// Declared access kind.
        access: AccessType,
        /// The attempted operation.
        operation: &'static str,
    },

    /// A buffer was read before it was bound to a node or loaded.
    #[error("buffer is not bound to a node field")]
    Unbound,

    /// The node behind a weak reference no longer exists.
    #[error("node has been disposed")]
    NodeDisposed,
}

impl FieldError {
    /// Returns true for out-of-range index errors.
    ///
    /// Bounds violations are caller data errors; everything else is a
    /// contract violation (bad id, wrong kind, wrong access).
    #[must_use]
    pub const fn is_bounds_violation(&self) -> bool {
        matches!(self, Self::IndexOutOfBounds { .. })
    }
}

/// Result type for field operations.
pub type FieldResult<T> = Result<T, FieldError>;
