//! Component registry: type name to constructor.
//!
//! Graph documents name component types as strings. The registry maps each
//! name either to a factory closure or to another graph document, which is
//! instantiated as a [`SubNet`](crate::subnet::SubNet).

use crate::loader;
use parking_lot::RwLock;
use rivulet_core::error::{Result, RivuletError};
use rivulet_core::flow::GraphDocument;
use rivulet_core::traits::Component;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Constructor for one component type.
pub type ComponentFactory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Maps component type names to constructors.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: RwLock<HashMap<String, ComponentFactory>>,
    graphs: RwLock<HashMap<String, GraphDocument>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory closure for `type_name`, replacing any earlier one.
    pub fn register<F, C>(&self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Component + 'static,
    {
        let factory: ComponentFactory = Arc::new(move || Box::new(factory()) as Box<dyn Component>);
        self.factories.write().insert(type_name.into(), factory);
    }

    /// Register a component type constructed with `Default`.
    pub fn register_default<C>(&self, type_name: impl Into<String>)
    where
        C: Component + Default + 'static,
    {
        self.register(type_name, C::default);
    }

    /// Register a graph document as a subnet type.
    pub fn register_graph(
        &self,
        type_name: impl Into<String>,
        document: GraphDocument,
    ) -> Result<()> {
        document.validate()?;
        self.graphs.write().insert(type_name.into(), document);
        Ok(())
    }

    /// Check if `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.read().contains_key(type_name) || self.graphs.read().contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .keys()
            .chain(self.graphs.read().keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Instantiate a component of type `type_name`.
    pub fn create(self: &Arc<Self>, type_name: &str) -> Result<Box<dyn Component>> {
        self.create_nested(type_name, &mut Vec::new())
    }

    /// Instantiate a component while building the graphs named in `building`.
    ///
    /// A graph that contains itself, directly or through other graphs, is
    /// rejected.
    pub(crate) fn create_nested(
        self: &Arc<Self>,
        type_name: &str,
        building: &mut Vec<String>,
    ) -> Result<Box<dyn Component>> {
        let factory = self.factories.read().get(type_name).cloned();
        if let Some(factory) = factory {
            return Ok(factory());
        }

        let document = self.graphs.read().get(type_name).cloned();
        let Some(document) = document else {
            return Err(RivuletError::UnknownComponentType {
                type_name: type_name.to_string(),
            });
        };

        if building.iter().any(|t| t == type_name) {
            return Err(RivuletError::InvalidConfig {
                field: type_name.to_string(),
                cause: format!("graph contains itself via {}", building.join(" -> ")),
            });
        }
        building.push(type_name.to_string());
        let subnet = loader::build_subnet(type_name, &document, self, building);
        building.pop();
        Ok(Box::new(subnet?) as Box<dyn Component>)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functional;

    #[test]
    fn register_and_create() {
        let registry = Arc::new(ComponentRegistry::new());
        registry.register("Numbers", || functional::values([1, 2]));
        assert!(registry.contains("Numbers"));
        assert!(!registry.contains("Letters"));

        let component = registry.create("Numbers").unwrap();
        assert_eq!(component.info().type_name, "Values");

        let err = registry.create("Letters").err().expect("unknown type was created");
        assert_eq!(err.code(), "E112");
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = ComponentRegistry::new();
        registry.register("Thing", || functional::values([1]));
        registry.register("Thing", || functional::collector().0);
        assert_eq!(registry.type_names(), vec!["Thing"]);
    }

    #[test]
    fn rejects_invalid_graph() {
        let registry = ComponentRegistry::new();
        let document: GraphDocument = serde_json::from_str(
            r#"{"processes": {}, "connections": [
                {"data": 1, "tgt": {"process": "Ghost", "port": "IN"}}
            ]}"#,
        )
        .unwrap();
        let err = registry.register_graph("Broken", document).unwrap_err();
        assert_eq!(err.code(), "E102");
        assert!(registry.type_names().is_empty());
    }
}
