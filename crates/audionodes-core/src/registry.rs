//! Node registry for creating nodes from type identifiers.
//!
//! Hosts address node types by name, so every type the engine can create
//! is registered here with a constructor.

use crate::compat::{Arc, HashMap, RwLock};
use crate::error::NodeRegistryError;
use crate::node::{Node, NodeContext};

/// Function that constructs a node for a given engine context.
pub type NodeConstructor =
    Arc<dyn Fn(&NodeContext) -> Result<Box<dyn Node>, NodeRegistryError> + Send + Sync>;

/// Registry of node constructors. Clones share the same table.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    constructors: Arc<RwLock<HashMap<String, NodeConstructor>>>,
}

impl NodeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node constructor, replacing any previous one for `name`.
    ///
    /// # Example
    /// ```ignore
    /// registry.register("OscillatorNode", |ctx| {
    ///     Ok(Box::new(OscillatorNode::new(ctx)))
    /// });
    /// ```
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&NodeContext) -> Result<Box<dyn Node>, NodeRegistryError> + Send + Sync + 'static,
    {
        self.constructors
            .write()
            .insert(name.into(), Arc::new(constructor));
    }

    /// Create a node from its registered name.
    pub fn create(
        &self,
        name: &str,
        context: &NodeContext,
    ) -> Result<Box<dyn Node>, NodeRegistryError> {
        // Clone the constructor out so user code never runs under the lock.
        let constructor = self
            .constructors
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| NodeRegistryError::UnknownNodeType(name.to_string()))?;

        constructor(context)
    }

    /// List all registered node types, sorted.
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.constructors.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.constructors.read().contains_key(name)
    }

    /// Unregister a node type. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.constructors.write().remove(name).is_some()
    }

    pub fn clear(&self) {
        self.constructors.write().clear();
    }
}

impl core::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}
