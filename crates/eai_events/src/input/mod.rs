//! # EventIn Input
//!
//! Writes from external code to node fields. Writes are not applied
//! immediately; they are queued on the [`ExternalEventQueue`] and applied
//! when the engine drains it.
//!
//! ## Coalescing
//!
//! Consecutive single-element edits (`set1_value`, `append`,
//! `insert_value`, `remove_value`) to the same field are merged into one
//! queued event while it waits:
//!
//! ```text
//!   set1_value(1, 9.0)  ─┐
//!   set1_value(2, 4.0)  ─┼──▶ one event: [1, 9, 4]
//!   append(5.0)         ─┘              [1, 9, 4, 5]
//! ```
//!
//! A whole-value `set_value` in between ends the run; the next edit starts
//! a new event from the live field value.

mod queue;

pub use queue::{DrainReport, ExternalEventQueue};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use eai_core::{
    FieldElement, FieldError, FieldId, FieldKind, FieldResult, FieldValue, NodeHandle,
};

use crate::error::EaiResult;

/// Array capacity an idle pending input keeps between writes.
const MAX_RETAINED_INPUT_ELEMENTS: usize = 1024;

/// The field an input event writes to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldTarget {
    node: NodeHandle,
    field: FieldId,
    kind: FieldKind,
}

impl FieldTarget {
    /// Creates a target.
    #[must_use]
    pub const fn new(node: NodeHandle, field: FieldId, kind: FieldKind) -> Self {
        Self { node, field, kind }
    }

    /// Target node.
    #[must_use]
    pub const fn node(&self) -> &NodeHandle {
        &self.node
    }

    /// Target field.
    #[must_use]
    pub const fn field(&self) -> FieldId {
        self.field
    }

    /// Declared kind of the target field.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }
}

struct PendingState {
    value: FieldValue,
    has_stored_value: bool,
    is_set1_value: bool,
}

/// A write waiting in the event queue.
pub struct PendingInput {
    target: FieldTarget,
    state: Mutex<PendingState>,
    /// Set while the queue holds this input; written under the queue lock.
    queued: AtomicBool,
}

impl PendingInput {
    /// Creates an idle input for `target`.
    #[must_use]
    pub fn new(target: FieldTarget) -> Self {
        let value = target.kind.default_value();
        Self::with_state(target, value, false)
    }

    /// Creates an input carrying a whole value.
    #[must_use]
    pub fn with_value(target: FieldTarget, value: FieldValue) -> Self {
        Self::with_state(target, value, true)
    }

    fn with_state(target: FieldTarget, value: FieldValue, stored: bool) -> Self {
        Self {
            target,
            state: Mutex::new(PendingState {
                value,
                has_stored_value: stored,
                is_set1_value: false,
            }),
            queued: AtomicBool::new(false),
        }
    }

    /// The field this input writes to.
    #[must_use]
    pub const fn target(&self) -> &FieldTarget {
        &self.target
    }

    /// Whether a value is waiting to be applied.
    #[must_use]
    pub fn has_stored_value(&self) -> bool {
        self.state.lock().has_stored_value
    }

    /// Whether the queue still holds this input, applied or not.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }

    pub(crate) fn set_queued(&self, queued: bool) {
        self.queued.store(queued, Ordering::Release);
    }

    /// Whether this input is an open run of single-element edits.
    #[must_use]
    pub fn is_set1_value(&self) -> bool {
        self.state.lock().is_set1_value
    }

    /// A copy of the stored value.
    #[must_use]
    pub fn stored_value(&self) -> Option<FieldValue> {
        let state = self.state.lock();
        state.has_stored_value.then(|| state.value.clone())
    }

    /// Writes the stored value to the node and clears the stored flags,
    /// also on failure.
    ///
    /// # Returns
    ///
    /// `false` if nothing was stored.
    ///
    /// # Errors
    ///
    /// The facade's error. It is not retried.
    pub fn apply(&self) -> FieldResult<bool> {
        let value = {
            let mut state = self.state.lock();
            if !state.has_stored_value {
                return Ok(false);
            }
            // Stays stored so the owning wrapper does not reuse it mid-write
            state.is_set1_value = false;
            mem::replace(&mut state.value, self.target.kind.default_value())
        };

        // No lock is held while listeners run
        let result = self
            .target
            .node
            .set_field_value(self.target.field, &value);

        let mut state = self.state.lock();
        state.value = value;
        state.value.release(MAX_RETAINED_INPUT_ELEMENTS);
        state.has_stored_value = false;
        state.is_set1_value = false;
        result.map(|()| true)
    }
}

impl fmt::Debug for PendingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PendingInput")
            .field("target", &self.target)
            .field("has_stored_value", &state.has_stored_value)
            .field("is_set1_value", &state.is_set1_value)
            .finish()
    }
}

/// Write handle for one node field.
///
/// Two handles are equal when they write the same field of the same node
/// with the same declared kind.
#[derive(Clone)]
pub struct EventIn {
    own: Arc<PendingInput>,
    queue: Arc<ExternalEventQueue>,
}

impl EventIn {
    /// Creates a write handle for a writable field.
    ///
    /// # Errors
    ///
    /// `InvalidField` for an unknown id, `AccessDenied` if the field is not
    /// an eventIn or exposedField.
    pub fn new(node: NodeHandle, field: FieldId, queue: Arc<ExternalEventQueue>) -> FieldResult<Self> {
        let decl = node.field_declaration(field)?;
        if !decl.access.is_writable() {
            return Err(FieldError::AccessDenied {
                access: decl.access,
                operation: "eventIn writes",
            });
        }
        let target = FieldTarget::new(node, field, decl.kind);
        Ok(Self {
            own: Arc::new(PendingInput::new(target)),
            queue,
        })
    }

    /// The field this handle writes to.
    #[must_use]
    pub fn target(&self) -> &FieldTarget {
        self.own.target()
    }

    /// Declared kind of the field.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.own.target().kind
    }

    /// Queues a whole-value write.
    ///
    /// # Errors
    ///
    /// `KindMismatch` for a value of another kind, `Disposed` once the
    /// queue is closed.
    pub fn set_value(&self, value: &FieldValue) -> EaiResult<()> {
        let target = self.own.target();
        if value.kind() != target.kind {
            return Err(FieldError::KindMismatch {
                expected: target.kind,
                found: value.kind(),
            }
            .into());
        }

        let mut queue = self.queue.lock();
        queue.ensure_open()?;

        let reuse_own = {
            let mut state = self.own.state.lock();
            if state.has_stored_value || self.own.is_queued() {
                false
            } else {
                state.value.assign_from(value);
                state.has_stored_value = true;
                state.is_set1_value = false;
                true
            }
        };

        let event = if reuse_own {
            Arc::clone(&self.own)
        } else {
            Arc::new(PendingInput::with_value(target.clone(), value.clone()))
        };
        queue.push(event);
        Ok(())
    }

    /// Queues a write of one element.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds`, `ElementMismatch` or `NotMultiValued`; nothing
    /// is queued or merged on error.
    pub fn set1_value(&self, index: usize, element: FieldElement) -> EaiResult<()> {
        self.edit(|value| value.set1(index, element))
    }

    /// Queues an append of one element.
    ///
    /// # Errors
    ///
    /// `ElementMismatch` or `NotMultiValued`.
    pub fn append(&self, element: FieldElement) -> EaiResult<()> {
        self.edit(|value| value.push(element))
    }

    /// Queues an insertion before `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds`, `ElementMismatch` or `NotMultiValued`.
    pub fn insert_value(&self, index: usize, element: FieldElement) -> EaiResult<()> {
        self.edit(|value| value.insert(index, element))
    }

    /// Queues a removal of one element.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` or `NotMultiValued`.
    pub fn remove_value(&self, index: usize) -> EaiResult<()> {
        self.edit(|value| value.remove(index).map(|_| ()))
    }

    /// Queues a write of the empty value.
    ///
    /// # Errors
    ///
    /// `NotMultiValued` for single-value fields.
    pub fn clear(&self) -> EaiResult<()> {
        let kind = self.kind();
        if !kind.is_multi() {
            return Err(FieldError::NotMultiValued(kind).into());
        }
        self.set_value(&kind.default_value())
    }

    /// Applies this handle's own pending write immediately.
    ///
    /// The emptied input keeps its queue slot until the next drain; writes
    /// made through this handle before then are queued behind it as new
    /// events.
    ///
    /// # Errors
    ///
    /// The facade's error; the stored value is discarded either way.
    pub fn do_event(&self) -> FieldResult<()> {
        self.own.apply().map(|_| ())
    }

    /// Whether the most recent queued write to this handle's field is an
    /// open edit run, whichever handle started it. The next single-element
    /// edit through any handle of the field merges into that run.
    #[must_use]
    pub fn is_conglomerating(&self) -> bool {
        self.queue
            .last_for(self.target())
            .is_some_and(|last| last.is_set1_value() && last.has_stored_value())
    }

    /// Merge-or-create for single-element edits.
    fn edit(&self, op: impl FnOnce(&mut FieldValue) -> FieldResult<()>) -> EaiResult<()> {
        let target = self.own.target();
        let mut queue = self.queue.lock();
        queue.ensure_open()?;

        if let Some(last) = queue.last_for(target) {
            let mut state = last.state.lock();
            if state.is_set1_value && state.has_stored_value {
                op(&mut state.value)?;
                drop(state);
                queue.note_conglomerated();
                return Ok(());
            }
        }

        let own_idle = !self.own.state.lock().has_stored_value && !self.own.is_queued();
        let event = if own_idle {
            Arc::clone(&self.own)
        } else {
            Arc::new(PendingInput::new(target.clone()))
        };

        {
            let mut state = event.state.lock();
            target.node.load_field_value(target.field, &mut state.value)?;
            op(&mut state.value)?;
            state.has_stored_value = true;
            state.is_set1_value = true;
        }
        queue.push(event);
        Ok(())
    }
}

impl PartialEq for EventIn {
    fn eq(&self, other: &Self) -> bool {
        self.target() == other.target()
    }
}

impl Eq for EventIn {}

impl Hash for EventIn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target().hash(state);
    }
}

impl fmt::Debug for EventIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventIn")
            .field("target", self.target())
            .field("conglomerating", &self.is_conglomerating())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EaiError;
    use eai_core::{AccessType, MemoryNode};

    fn setup() -> (NodeHandle, Arc<ExternalEventQueue>) {
        let node = MemoryNode::builder("Coordinate")
            .field(
                "point",
                AccessType::ExposedField,
                FieldValue::MfFloat(vec![1.0, 2.0, 3.0]),
            )
            .field("scale", AccessType::EventIn, FieldValue::SfFloat(1.0))
            .field("changed", AccessType::EventOut, FieldValue::SfBool(false))
            .build();
        (node, Arc::new(ExternalEventQueue::new()))
    }

    fn point(node: &NodeHandle) -> FieldValue {
        node.field_value(FieldId(0)).unwrap()
    }

    #[test]
    fn test_set1_runs_coalesce() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();

        input.set1_value(1, FieldElement::Float(9.0)).unwrap();
        input.set1_value(1, FieldElement::Float(9.0)).unwrap();
        assert!(input.is_conglomerating());
        assert_eq!(queue.pending_count(), 1);

        let report = queue.drain();
        assert_eq!(report.applied, 1);
        assert_eq!(report.conglomerated, 1);
        assert_eq!(point(&node), FieldValue::MfFloat(vec![1.0, 9.0, 3.0]));
        assert!(!input.is_conglomerating());
    }

    #[test]
    fn test_set_value_breaks_run() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();

        input.set1_value(0, FieldElement::Float(5.0)).unwrap();
        input
            .set_value(&FieldValue::MfFloat(vec![7.0, 7.0, 7.0]))
            .unwrap();
        input.set1_value(1, FieldElement::Float(8.0)).unwrap();
        assert_eq!(queue.pending_count(), 3);

        let report = queue.drain();
        assert_eq!(report.applied, 3);
        assert_eq!(report.conglomerated, 0);
        // The second run started from the live value, before the drain
        assert_eq!(point(&node), FieldValue::MfFloat(vec![1.0, 8.0, 3.0]));
    }

    #[test]
    fn test_failed_first_edit_is_not_queued() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();

        let err = input.set1_value(3, FieldElement::Float(1.0)).unwrap_err();
        assert_eq!(
            err,
            EaiError::Field(FieldError::IndexOutOfBounds { index: 3, size: 3 })
        );
        assert_eq!(queue.pending_count(), 0);
        assert!(!input.is_conglomerating());

        // A failed merge leaves the queued run untouched
        input.set1_value(0, FieldElement::Float(4.0)).unwrap();
        assert!(input.set1_value(0, FieldElement::Int32(4)).is_err());
        queue.drain();
        assert_eq!(point(&node), FieldValue::MfFloat(vec![4.0, 2.0, 3.0]));
    }

    #[test]
    fn test_edits_merge_across_operations() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();

        input.append(FieldElement::Float(4.0)).unwrap();
        input.insert_value(0, FieldElement::Float(0.0)).unwrap();
        input.remove_value(2).unwrap();
        assert_eq!(queue.pending_count(), 1);

        queue.drain();
        assert_eq!(point(&node), FieldValue::MfFloat(vec![0.0, 1.0, 3.0, 4.0]));
    }

    #[test]
    fn test_handles_share_runs_on_same_target() {
        let (node, queue) = setup();
        let a = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();
        let b = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();
        assert_eq!(a, b);

        a.set1_value(0, FieldElement::Float(6.0)).unwrap();
        b.set1_value(2, FieldElement::Float(6.0)).unwrap();
        assert_eq!(queue.pending_count(), 1);

        queue.drain();
        assert_eq!(point(&node), FieldValue::MfFloat(vec![6.0, 2.0, 6.0]));
    }

    #[test]
    fn test_repeated_set_value_queues_each() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(1), Arc::clone(&queue)).unwrap();

        input.set_value(&FieldValue::SfFloat(2.0)).unwrap();
        input.set_value(&FieldValue::SfFloat(3.0)).unwrap();
        assert_eq!(queue.pending_count(), 2);
        assert!(!input.is_conglomerating());

        assert_eq!(queue.drain().applied, 2);
        assert_eq!(node.field_value(FieldId(1)).unwrap(), FieldValue::SfFloat(3.0));
    }

    #[test]
    fn test_kind_and_access_checks() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(1), Arc::clone(&queue)).unwrap();
        assert!(matches!(
            input.set_value(&FieldValue::SfInt32(1)),
            Err(EaiError::Field(FieldError::KindMismatch { .. }))
        ));
        assert_eq!(
            input.clear().unwrap_err(),
            EaiError::Field(FieldError::NotMultiValued(FieldKind::SfFloat))
        );

        assert!(matches!(
            EventIn::new(node, FieldId(2), queue),
            Err(FieldError::AccessDenied {
                access: AccessType::EventOut,
                ..
            })
        ));
    }

    #[test]
    fn test_do_event_applies_directly() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();
        input.clear().unwrap();

        input.do_event().unwrap();
        assert_eq!(point(&node), FieldValue::MfFloat(Vec::new()));

        // Already applied, the queued copy is a no-op
        let report = queue.drain();
        assert_eq!(report.applied, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_write_after_do_event_keeps_last_write_winning() {
        let (node, queue) = setup();
        let first = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();
        let second = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();

        first.set_value(&FieldValue::MfFloat(vec![1.0])).unwrap();
        second.set_value(&FieldValue::MfFloat(vec![2.0])).unwrap();
        first.do_event().unwrap();
        first.set_value(&FieldValue::MfFloat(vec![3.0])).unwrap();
        assert_eq!(queue.pending_count(), 3);

        let report = queue.drain();
        assert_eq!(report.applied, 2);
        assert_eq!(point(&node), FieldValue::MfFloat(vec![3.0]));

        // Drained, so the handle's own input is reused again
        first.set_value(&FieldValue::MfFloat(vec![4.0])).unwrap();
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.drain().applied, 1);
        assert_eq!(point(&node), FieldValue::MfFloat(vec![4.0]));
    }

    #[test]
    fn test_edit_after_do_event_starts_new_run() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();

        input.set1_value(0, FieldElement::Float(5.0)).unwrap();
        input.do_event().unwrap();
        assert!(!input.is_conglomerating());

        input.set1_value(1, FieldElement::Float(6.0)).unwrap();
        assert_eq!(queue.pending_count(), 2);
        assert_eq!(queue.drain().applied, 1);
        assert_eq!(point(&node), FieldValue::MfFloat(vec![5.0, 6.0, 3.0]));
    }

    #[test]
    fn test_conglomerating_reports_shared_run() {
        let (node, queue) = setup();
        let a = EventIn::new(node.clone(), FieldId(0), Arc::clone(&queue)).unwrap();
        let b = EventIn::new(node, FieldId(0), Arc::clone(&queue)).unwrap();

        a.set1_value(0, FieldElement::Float(6.0)).unwrap();
        assert!(a.is_conglomerating());
        assert!(b.is_conglomerating());

        b.set_value(&FieldValue::MfFloat(Vec::new())).unwrap();
        assert!(!a.is_conglomerating());
    }

    #[test]
    fn test_update_batch_defers_drain() {
        let (node, queue) = setup();
        let input = EventIn::new(node.clone(), FieldId(1), Arc::clone(&queue)).unwrap();

        queue.begin_update();
        queue.begin_update();
        input.set_value(&FieldValue::SfFloat(5.0)).unwrap();
        assert!(queue.drain().deferred);
        assert!(!queue.end_update());
        assert!(queue.drain().deferred);
        assert!(queue.end_update());
        assert!(!queue.end_update());

        assert_eq!(queue.drain().applied, 1);
        assert_eq!(node.field_value(FieldId(1)).unwrap(), FieldValue::SfFloat(5.0));
    }

    #[test]
    fn test_closed_queue_rejects_writes() {
        let (node, queue) = setup();
        let input = EventIn::new(node, FieldId(1), Arc::clone(&queue)).unwrap();
        input.set_value(&FieldValue::SfFloat(5.0)).unwrap();

        assert_eq!(queue.close(), 1);
        assert!(queue.is_closed());
        assert_eq!(
            input.set_value(&FieldValue::SfFloat(6.0)).unwrap_err(),
            EaiError::Disposed
        );
        assert_eq!(
            input.set1_value(0, FieldElement::Float(1.0)).unwrap_err(),
            EaiError::Disposed
        );
    }

    #[test]
    fn test_failures_are_reported() {
        let (node, queue) = setup();
        let target = FieldTarget::new(node, FieldId(9), FieldKind::SfFloat);
        queue
            .post(Arc::new(PendingInput::with_value(
                target.clone(),
                FieldValue::SfFloat(1.0),
            )))
            .unwrap();

        let report = queue.drain();
        assert_eq!(report.applied, 0);
        assert_eq!(report.failures, vec![(target, FieldError::InvalidField(FieldId(9)))]);
    }
}
