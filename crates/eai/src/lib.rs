//! # EAI
//!
//! External Authoring Interface for VRML/X3D scene graphs: external code
//! reads and writes live node fields through buffered, multi-threaded
//! event plumbing.
//!
//! ## Architecture Rules
//!
//! 1. **Writes are queued** - eventIn writes reach the node when the engine
//!    calls [`EaiBrowser::process_events`]
//! 2. **Reads are isolated** - buffered eventOut listeners run on dispatcher
//!    threads against their own snapshot
//! 3. **One session owns everything** - dropping the [`EaiBrowser`] stops
//!    its threads
//! 4. **Lifecycle is observable** - [`BrowserListener`]s hear `Initialized`,
//!    `UrlError` and `Shutdown` on the notifier thread
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use eai::{EaiBrowser, EaiConfig};
//! use eai_core::{AccessType, FieldElement, FieldValue, MemoryNode};
//! use eai_events::{EventOutListener, OutputEvent, SystemClock};
//!
//! let browser = EaiBrowser::new(EaiConfig::default(), Arc::new(SystemClock)).unwrap();
//! let coords = MemoryNode::builder("Coordinate")
//!     .field("point", AccessType::ExposedField, FieldValue::MfFloat(vec![1.0, 2.0, 3.0]))
//!     .build();
//! browser.register_node("COORDS", coords).unwrap();
//!
//! let node = browser.node("COORDS").unwrap();
//! let out = browser.event_out(&node, "point").unwrap();
//! let listener: Arc<dyn EventOutListener> = Arc::new(|event: &OutputEvent| {
//!     let _ = event.buffer().size();
//! });
//! out.add_listener(listener).unwrap();
//!
//! let input = browser.event_in(&node, "point").unwrap();
//! input.set1_value(1, FieldElement::Float(9.0)).unwrap();
//! browser.process_events().unwrap();
//! browser.dispose();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod browser;
pub mod config;
pub mod notifier;
pub mod registry;

pub use browser::EaiBrowser;
pub use config::{EaiConfig, SessionConfig};
pub use notifier::{BrowserEvent, BrowserListener, BrowserNotifier};
pub use registry::NodeRegistry;

pub use eai_core::{
    AccessType, FieldElement, FieldError, FieldId, FieldKind, FieldValue, MemoryNode, NodeHandle,
};
pub use eai_events::{
    DispatchConfig, DispatchMode, DrainReport, EaiError, EaiResult, EventIn, EventOut,
    EventOutListener, OutputEvent,
};
