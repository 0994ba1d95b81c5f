//! # EAI Events
//!
//! The event pipeline between a running scene graph and external code.
//!
//! ## Architecture
//!
//! ```text
//!                 eventOut                                   eventIn
//!  ┌───────┐  field_changed  ┌──────────────┐     ┌─────────┐  set_value  ┌──────────────┐
//!  │ Node  │ ──────────────▶ │ EventAdapter │     │  Node   │ ◀────────── │ EventQueue   │ ◀── EventIn
//!  └───────┘                 └──────┬───────┘     └─────────┘   drain()   └──────────────┘
//!                                   │ snapshot
//!                                   ▼
//!                         EventAdapterThreadPool ──▶ EventOutListener
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use eai_core::{AccessType, FieldValue, MemoryNode};
//! use eai_events::{
//!     DispatchConfig, EaiFieldFactory, EventAdapterFactory, ExternalEventQueue, SystemClock,
//! };
//!
//! let node = MemoryNode::builder("Material")
//!     .field("transparency", AccessType::ExposedField, FieldValue::SfFloat(0.0))
//!     .build();
//!
//! let adapters = Arc::new(
//!     EventAdapterFactory::new(DispatchConfig::synchronous(), Arc::new(SystemClock)).unwrap(),
//! );
//! let queue = Arc::new(ExternalEventQueue::new());
//! let fields = EaiFieldFactory::new(Arc::clone(&queue), adapters);
//!
//! let input = fields.event_in(&node, "transparency").unwrap();
//! input.set_value(&FieldValue::SfFloat(0.5)).unwrap();
//! queue.drain();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod adapter;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod field_factory;
pub mod input;
pub mod output;

pub use adapter::{BufferReclaimer, BufferedEventAdapter, EventAdapter, SynchronousEventAdapter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DispatchConfig, DispatchMode};
pub use dispatch::{DispatchStats, EventAdapterThreadPool};
pub use error::{EaiError, EaiResult};
pub use factory::EventAdapterFactory;
pub use field_factory::EaiFieldFactory;
pub use input::{DrainReport, EventIn, ExternalEventQueue, FieldTarget, PendingInput};
pub use output::{EventOut, EventOutListener, OutputBuffer, OutputEvent, DEFAULT_MAX_RETAINED};
