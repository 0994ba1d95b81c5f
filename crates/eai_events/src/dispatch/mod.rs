//! # Event Dispatch
//!
//! Worker threads that run eventOut listeners off the engine thread.

mod thread_pool;

pub use thread_pool::{DispatchStats, EventAdapterThreadPool};
