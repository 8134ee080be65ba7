//! Runtime catalogue of callable tools.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::contract::Tool;
use crate::schema::ToolSchema;

#[derive(Default)]
struct Catalogue {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

/// Registry that stores tool implementations keyed by name.
///
/// Reads and writes are serialized through a reader-writer lock, so tools can
/// be registered while batches are executing without either side observing a
/// half-updated catalogue.
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<Catalogue>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("registered", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single insert or remove, so a poisoned lock still
    // guards a consistent catalogue.
    fn read(&self) -> RwLockReadGuard<'_, Catalogue> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalogue> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a shared tool under its own name.
    ///
    /// An existing tool with the same name is replaced and returned; the
    /// replacement keeps the original registration position.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_owned();
        let mut catalogue = self.write();
        let previous = catalogue.tools.insert(name.clone(), tool);

        if previous.is_some() {
            warn!(tool = %name, "tool already registered, overwriting");
        } else {
            catalogue.order.push(name.clone());
            info!(tool = %name, "registered tool");
        }

        previous
    }

    /// Registers an owned tool implementation.
    pub fn register_tool<T>(&self, tool: T) -> Option<Arc<dyn Tool>>
    where
        T: Tool + 'static,
    {
        self.register(Arc::new(tool))
    }

    /// Removes the named tool, returning it if it was present.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let mut catalogue = self.write();
        let Some(removed) = catalogue.tools.remove(name) else {
            warn!(tool = %name, "tool not found for unregistration");
            return None;
        };

        catalogue.order.retain(|registered| registered != name);
        info!(tool = %name, "unregistered tool");
        Some(removed)
    }

    /// Returns the tool matching the supplied name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.read().tools.get(name).cloned()
    }

    /// Returns `true` if a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read().tools.contains_key(name)
    }

    /// Snapshot of every published schema, in registration order.
    #[must_use]
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let catalogue = self.read();
        catalogue
            .order
            .iter()
            .filter_map(|name| catalogue.tools.get(name))
            .map(|tool| tool.schema().clone())
            .collect()
    }

    /// Names of every registered tool, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.read().order.clone()
    }

    /// Registered tool instances, in registration order.
    #[must_use]
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        let catalogue = self.read();
        catalogue
            .order
            .iter()
            .filter_map(|name| catalogue.tools.get(name).cloned())
            .collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().tools.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().tools.is_empty()
    }
}
