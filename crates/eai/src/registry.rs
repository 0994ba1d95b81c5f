//! # Node Registry
//!
//! DEF name → node lookup for the nodes a host exposes to external code.

use std::collections::HashMap;

use parking_lot::RwLock;

use eai_core::NodeHandle;

/// Named nodes of one session.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, NodeHandle>>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` under `name`, returning the node it replaced.
    pub fn register(&self, name: impl Into<String>, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.write().insert(name.into(), node)
    }

    /// Removes the node registered under `name`.
    pub fn unregister(&self, name: &str) -> Option<NodeHandle> {
        self.nodes.write().remove(name)
    }

    /// The node registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<NodeHandle> {
        self.nodes.read().get(name).cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.nodes.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eai_core::MemoryNode;

    #[test]
    fn test_register_and_replace() {
        let registry = NodeRegistry::new();
        let a = MemoryNode::builder("Group").build();
        let b = MemoryNode::builder("Group").build();

        assert!(registry.register("ROOT", a.clone()).is_none());
        assert_eq!(registry.register("ROOT", b.clone()), Some(a));
        assert_eq!(registry.get("ROOT"), Some(b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_and_clear() {
        let registry = NodeRegistry::new();
        registry.register("B", MemoryNode::builder("Shape").build());
        registry.register("A", MemoryNode::builder("Shape").build());

        assert_eq!(registry.names(), vec!["A".to_string(), "B".to_string()]);
        assert!(registry.unregister("A").is_some());
        assert!(registry.get("A").is_none());

        registry.clear();
        assert!(registry.is_empty());
    }
}
