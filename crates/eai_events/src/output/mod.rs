//! # EventOut Output
//!
//! What a listener receives when a field it watches changes: a buffer
//! holding the value, the event timestamp and the field's user data.

mod buffer;
mod event_out;
mod listener;

pub use buffer::{OutputBuffer, DEFAULT_MAX_RETAINED};
pub use event_out::EventOut;
pub use listener::EventOutListener;

use eai_core::UserData;

/// One eventOut notification.
#[derive(Debug)]
pub struct OutputEvent {
    /// The value carrier.
    buffer: OutputBuffer,
    /// Event time in seconds.
    timestamp: f64,
    /// User data of the source field.
    user_data: Option<UserData>,
}

impl OutputEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(buffer: OutputBuffer, timestamp: f64, user_data: Option<UserData>) -> Self {
        Self {
            buffer,
            timestamp,
            user_data,
        }
    }

    /// The value carrier.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Event time in seconds.
    #[inline]
    #[must_use]
    pub const fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// User data attached to the source field.
    #[must_use]
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Gives the buffer back for recycling.
    #[must_use]
    pub fn into_buffer(self) -> OutputBuffer {
        self.buffer
    }
}
