//! # EAI Field Factory
//!
//! Resolves field names to eventIn and eventOut handles, checking the
//! declared access kind.

use std::sync::Arc;

use eai_core::{FieldId, NodeHandle};

use crate::error::{EaiError, EaiResult};
use crate::factory::EventAdapterFactory;
use crate::input::{EventIn, ExternalEventQueue};
use crate::output::EventOut;

/// Creates field handles bound to one queue and one adapter factory.
#[derive(Clone)]
pub struct EaiFieldFactory {
    queue: Arc<ExternalEventQueue>,
    adapters: Arc<EventAdapterFactory>,
}

impl EaiFieldFactory {
    /// Creates a field factory.
    #[must_use]
    pub fn new(queue: Arc<ExternalEventQueue>, adapters: Arc<EventAdapterFactory>) -> Self {
        Self { queue, adapters }
    }

    /// Write handle for the field named `name`.
    ///
    /// # Errors
    ///
    /// `InvalidEventIn` if the field is missing or is not an eventIn or
    /// exposedField.
    pub fn event_in(&self, node: &NodeHandle, name: &str) -> EaiResult<EventIn> {
        let field = Self::lookup(node, name).ok_or_else(|| invalid_in(node, name))?;
        EventIn::new(node.clone(), field, Arc::clone(&self.queue)).map_err(|err| {
            tracing::debug!("Rejected eventIn {}.{}: {}", node.type_name(), name, err);
            invalid_in(node, name)
        })
    }

    /// Live read handle for the field named `name`.
    ///
    /// # Errors
    ///
    /// `InvalidEventOut` if the field is missing or is not an eventOut or
    /// exposedField.
    pub fn event_out(&self, node: &NodeHandle, name: &str) -> EaiResult<EventOut> {
        let field = Self::lookup(node, name).ok_or_else(|| invalid_out(node, name))?;
        EventOut::live(node.clone(), field, Arc::clone(&self.adapters)).map_err(|err| {
            tracing::debug!("Rejected eventOut {}.{}: {}", node.type_name(), name, err);
            invalid_out(node, name)
        })
    }

    /// Snapshot read handle for `field`.
    ///
    /// # Errors
    ///
    /// The facade's error if the field is missing, unreadable or cannot be
    /// loaded.
    pub fn stored_event_out(&self, node: &NodeHandle, field: FieldId) -> EaiResult<EventOut> {
        Ok(EventOut::stored(
            node.clone(),
            field,
            Arc::clone(&self.adapters),
        )?)
    }

    /// The adapter factory behind eventOut listeners.
    #[must_use]
    pub fn adapters(&self) -> &Arc<EventAdapterFactory> {
        &self.adapters
    }

    /// The queue behind eventIn writes.
    #[must_use]
    pub fn queue(&self) -> &Arc<ExternalEventQueue> {
        &self.queue
    }

    fn lookup(node: &NodeHandle, name: &str) -> Option<FieldId> {
        node.field_index(name)
    }
}

fn invalid_in(node: &NodeHandle, name: &str) -> EaiError {
    EaiError::InvalidEventIn(format!("{}.{}", node.type_name(), name))
}

fn invalid_out(node: &NodeHandle, name: &str) -> EaiError {
    EaiError::InvalidEventOut(format!("{}.{}", node.type_name(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::DispatchConfig;
    use crate::output::{EventOutListener, OutputEvent};
    use eai_core::{AccessType, FieldKind, FieldValue, MemoryNode};

    fn setup() -> (NodeHandle, EaiFieldFactory) {
        let node = MemoryNode::builder("TouchSensor")
            .field("enabled", AccessType::ExposedField, FieldValue::SfBool(true))
            .field("isActive", AccessType::EventOut, FieldValue::SfBool(false))
            .field("set_bind", AccessType::EventIn, FieldValue::SfBool(false))
            .field("description", AccessType::Field, FieldValue::SfString(String::new()))
            .field(
                "keys",
                AccessType::ExposedField,
                FieldValue::MfFloat(vec![0.0, 1.0]),
            )
            .build();
        let adapters = Arc::new(
            EventAdapterFactory::new(DispatchConfig::synchronous(), Arc::new(ManualClock::new(0.0)))
                .unwrap(),
        );
        let factory = EaiFieldFactory::new(Arc::new(ExternalEventQueue::new()), adapters);
        (node, factory)
    }

    #[test]
    fn test_event_in_access_rules() {
        let (node, factory) = setup();
        assert_eq!(factory.event_in(&node, "enabled").unwrap().kind(), FieldKind::SfBool);
        assert!(factory.event_in(&node, "set_bind").is_ok());
        assert_eq!(
            factory.event_in(&node, "isActive").unwrap_err(),
            EaiError::InvalidEventIn("TouchSensor.isActive".to_string())
        );
        assert!(matches!(
            factory.event_in(&node, "description"),
            Err(EaiError::InvalidEventIn(_))
        ));
        assert!(matches!(
            factory.event_in(&node, "missing"),
            Err(EaiError::InvalidEventIn(_))
        ));
    }

    #[test]
    fn test_event_out_access_rules() {
        let (node, factory) = setup();
        assert!(factory.event_out(&node, "enabled").is_ok());
        assert!(factory.event_out(&node, "isActive").is_ok());
        assert_eq!(
            factory.event_out(&node, "set_bind").unwrap_err(),
            EaiError::InvalidEventOut("TouchSensor.set_bind".to_string())
        );
    }

    #[test]
    fn test_live_and_stored_event_outs() {
        let (node, factory) = setup();
        let live = factory.event_out(&node, "keys").unwrap();
        let stored = factory.stored_event_out(&node, live.field()).unwrap();
        assert!(stored.is_stored());
        assert!(!live.is_stored());

        node.set_field_value(live.field(), &FieldValue::MfFloat(vec![0.5]))
            .unwrap();
        assert_eq!(live.size().unwrap(), 1);
        assert_eq!(stored.size().unwrap(), 2);
    }

    #[test]
    fn test_listeners_route_through_adapter() {
        let (node, factory) = setup();
        let out = factory.event_out(&node, "enabled").unwrap();
        let listener: Arc<dyn EventOutListener> = Arc::new(|_: &OutputEvent| {});

        out.add_listener(Arc::clone(&listener)).unwrap();
        assert_eq!(out.listener_count(), 1);
        assert_eq!(factory.adapters().adapter_count(), 1);

        out.remove_listener(&listener);
        assert_eq!(out.listener_count(), 0);
    }
}
