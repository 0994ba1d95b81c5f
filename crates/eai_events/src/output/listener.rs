//! EventOut listener callback.

use super::OutputEvent;

/// Receives eventOut notifications.
///
/// In buffered mode the callback runs on a dispatcher thread and the event
/// buffer is a snapshot owned by this one call. In synchronous mode it runs
/// on the engine thread and the buffer reads the live field.
pub trait EventOutListener: Send + Sync {
    /// A watched field changed.
    fn callback(&self, event: &OutputEvent);
}

impl<F> EventOutListener for F
where
    F: Fn(&OutputEvent) + Send + Sync,
{
    fn callback(&self, event: &OutputEvent) {
        self(event);
    }
}
