//! # EAI Core
//!
//! Field model and Field Access Facade for the External Authoring
//! Interface runtime.
//!
//! ## Architecture Rules
//!
//! 1. **The scene graph is a collaborator** - it is reached only through
//!    [`FieldAccess`]
//! 2. **Field ids are the primary key** - every per-field table is indexed by
//!    [`FieldId`]
//! 3. **Values are one closed enum** - [`FieldValue`] covers every VRML field
//!    kind
//!
//! ## Example
//!
//! ```rust
//! use eai_core::{AccessType, FieldValue, MemoryNode};
//!
//! let node = MemoryNode::builder("Transform")
//!     .field("translation", AccessType::ExposedField, FieldValue::SfVec3f([0.0; 3]))
//!     .build();
//!
//! let id = node.field_index("translation").unwrap();
//! node.set_field_value(id, &FieldValue::SfVec3f([1.0, 2.0, 3.0])).unwrap();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod field;
pub mod memory;
pub mod node;

pub use error::{FieldError, FieldResult};
pub use field::{
    AccessType, FieldDeclaration, FieldElement, FieldId, FieldKind, FieldValue, SfImage,
};
pub use memory::BufferPool;
pub use node::{
    same_object, FieldAccess, FieldChangeListener, MemoryNode, MemoryNodeBuilder, NodeHandle,
    NodeId, UserData, WeakNodeHandle,
};
