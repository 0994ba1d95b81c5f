//! # Object Recycling
//!
//! Bounded free lists for objects that are created and dropped on every
//! event: snapshot buffers and dispatch records.
//!
//! ## Design Rules
//!
//! - Recycled objects are reset by the caller before they go back
//! - A full pool drops the returned object instead of growing
//! - Pools are not synchronized; the owner wraps them in its own lock

mod pool;

pub use pool::BufferPool;
