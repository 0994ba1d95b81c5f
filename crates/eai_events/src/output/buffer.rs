//! # Output Buffer
//!
//! Holds one field value for an eventOut reader.
//!
//! ## States
//!
//! ```text
//!            initialize()              load_output_value()
//!   idle ───────────────▶ live-bound ─────────────────────▶ snapshot
//!    ▲                                                          │
//!    └──────────────────────────── reset() ─────────────────────┘
//! ```
//!
//! A live-bound buffer reads through to the node on every access. A
//! snapshot buffer serves the value copied by the last load.

use eai_core::{FieldElement, FieldError, FieldId, FieldKind, FieldResult, FieldValue, NodeHandle};

/// Array capacity kept across [`OutputBuffer::reset`] unless configured.
pub const DEFAULT_MAX_RETAINED: usize = 1024;

/// A reusable eventOut value container.
#[derive(Debug)]
pub struct OutputBuffer {
    /// Declared kind of the bound field.
    kind: FieldKind,
    /// Bound node, dropped on reset.
    node: Option<NodeHandle>,
    /// Bound field.
    field: Option<FieldId>,
    /// Snapshot storage.
    value: FieldValue,
    /// Whether `value` holds a snapshot.
    loaded: bool,
    /// Array capacity kept across resets.
    max_retained: usize,
}

impl OutputBuffer {
    /// Creates an idle buffer for values of `kind`.
    #[must_use]
    pub fn new(kind: FieldKind) -> Self {
        Self::with_retention(kind, DEFAULT_MAX_RETAINED)
    }

    /// Creates an idle buffer that keeps at most `max_retained` array
    /// elements of capacity between uses.
    #[must_use]
    pub fn with_retention(kind: FieldKind, max_retained: usize) -> Self {
        Self {
            kind,
            node: None,
            field: None,
            value: kind.default_value(),
            loaded: false,
            max_retained,
        }
    }

    /// Creates a buffer bound to a live field.
    #[must_use]
    pub fn bound(node: NodeHandle, field: FieldId, kind: FieldKind) -> Self {
        let mut buffer = Self::new(kind);
        buffer.initialize(node, field);
        buffer
    }

    /// Binds the buffer to a node field. No data is read.
    pub fn initialize(&mut self, node: NodeHandle, field: FieldId) {
        self.node = Some(node);
        self.field = Some(field);
        self.loaded = false;
    }

    /// Copies the current field value into the buffer, reusing the existing
    /// storage.
    ///
    /// # Errors
    ///
    /// `Unbound` before [`initialize`](Self::initialize), or the facade's
    /// error for an invalid field.
    pub fn load_output_value(&mut self) -> FieldResult<()> {
        let Self {
            node, field, value, ..
        } = &mut *self;
        let (Some(node), Some(field)) = (node.as_ref(), *field) else {
            return Err(FieldError::Unbound);
        };
        node.load_field_value(field, value)?;
        self.loaded = true;
        Ok(())
    }

    /// Drops the node binding and any node references in the stored value.
    ///
    /// Idempotent.
    pub fn reset(&mut self) {
        self.node = None;
        self.field = None;
        self.value.release(self.max_retained);
        self.loaded = false;
    }

    /// Declared kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Whether the buffer serves a snapshot.
    #[inline]
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The bound node, if any.
    #[must_use]
    pub fn node(&self) -> Option<&NodeHandle> {
        self.node.as_ref()
    }

    /// The bound field, if any.
    #[must_use]
    pub const fn field(&self) -> Option<FieldId> {
        self.field
    }

    /// Element count of the value. Single-value kinds report 1.
    ///
    /// # Errors
    ///
    /// `Unbound` for an idle buffer, or a facade error for a live read.
    pub fn size(&self) -> FieldResult<usize> {
        self.with_value(FieldValue::len)
    }

    /// One element of a multi-value field.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` past the end, `NotMultiValued` for SF kinds,
    /// `Unbound` for an idle buffer.
    pub fn get1_value(&self, index: usize) -> FieldResult<FieldElement> {
        self.with_value(|value| value.get1(index))?
    }

    /// A copy of the whole value.
    ///
    /// # Errors
    ///
    /// `Unbound` for an idle buffer, or a facade error for a live read.
    pub fn value(&self) -> FieldResult<FieldValue> {
        if self.loaded {
            return Ok(self.value.clone());
        }
        let (node, field) = self.binding()?;
        node.field_value(field)
    }

    /// Runs `f` against the value without copying a snapshot.
    ///
    /// # Errors
    ///
    /// `Unbound` for an idle buffer, or a facade error for a live read.
    pub fn with_value<R>(&self, f: impl FnOnce(&FieldValue) -> R) -> FieldResult<R> {
        if self.loaded {
            return Ok(f(&self.value));
        }
        let (node, field) = self.binding()?;
        let live = node.field_value(field)?;
        Ok(f(&live))
    }

    /// Capacity of the snapshot storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.value.capacity()
    }

    fn binding(&self) -> FieldResult<(&NodeHandle, FieldId)> {
        match (&self.node, self.field) {
            (Some(node), Some(field)) => Ok((node, field)),
            _ => Err(FieldError::Unbound),
        }
    }
}
