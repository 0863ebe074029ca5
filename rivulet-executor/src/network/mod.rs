//! Network orchestration.
//!
//! A [`Network`] owns every component instance of a graph together with the
//! connections between them. Building happens through `&mut self` methods
//! ([`Network::add_component`], [`Network::connect`],
//! [`Network::initialize`]); configuration errors are reported there and
//! never reach the scheduler. [`Network::go`] then runs the graph to
//! completion.

mod build;
mod run;

pub use build::ConnectionOptions;

use crate::config::NetworkConfig;
use crate::registry::ComponentRegistry;
use parking_lot::Mutex;
use rivulet_core::connection::Connection;
use rivulet_core::port::PortRef;
use rivulet_core::process::Process;
use rivulet_core::scheduler::RunTable;
use rivulet_core::shared::{Counters, SharedState};
use rivulet_core::traits::Component;
use rivulet_core::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One component instance.
struct Entry {
    process: Process,
    component: Box<dyn Component>,
}

/// A recorded edge, kept for exporting the graph.
#[derive(Debug, Clone)]
pub(crate) struct EdgeRecord {
    pub(crate) from: PortRef,
    pub(crate) to: PortRef,
    pub(crate) capacity: Option<usize>,
    pub(crate) drop_oldest: Option<bool>,
}

/// A recorded initial value, kept for exporting the graph.
#[derive(Debug, Clone)]
pub(crate) struct InitialRecord {
    pub(crate) value: Value,
    pub(crate) to: PortRef,
}

/// A graph of components and the connections between them.
pub struct Network {
    config: NetworkConfig,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    connections: Vec<Arc<Connection>>,
    shared: Arc<SharedState>,
    registry: Option<Arc<ComponentRegistry>>,
    edges: Vec<EdgeRecord>,
    initials: Vec<InitialRecord>,
    active: Arc<Mutex<Option<Arc<RunTable>>>>,
}

impl Network {
    /// Create an empty network with default configuration.
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    /// Create an empty network.
    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            index: HashMap::new(),
            connections: Vec::new(),
            shared: Arc::new(SharedState::new()),
            registry: None,
            edges: Vec::new(),
            initials: Vec::new(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Use `registry` to instantiate components by type name.
    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Get the network name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the component registry, if any.
    pub fn registry(&self) -> Option<&Arc<ComponentRegistry>> {
        self.registry.as_ref()
    }

    /// Number of component instances.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the network has no components.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a component with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Component names in insertion order.
    pub fn component_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.process.name()).collect()
    }

    /// Get the process of a component.
    pub fn process(&self, name: &str) -> Option<&Process> {
        self.index.get(name).map(|&i| &self.entries[i].process)
    }

    /// Number of distinct connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the state shared by every component of a top-level run.
    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Aggregate packet counters of the last run.
    pub fn counters(&self) -> Counters {
        self.shared.counters()
    }

    /// Snapshot of the network-wide globals.
    pub fn globals(&self) -> HashMap<String, Value> {
        self.shared.globals()
    }

    /// Set a network-wide global before running.
    pub fn set_global(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.shared.set_global(key, value.into())
    }

    pub(crate) fn edge_records(&self) -> &[EdgeRecord] {
        &self.edges
    }

    pub(crate) fn initial_records(&self) -> &[InitialRecord] {
        &self.initials
    }

    /// Get a handle that can terminate a running [`Network::go`].
    pub fn handle(&self) -> NetworkHandle {
        NetworkHandle {
            name: self.config.name.clone(),
            active: Arc::clone(&self.active),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("name", &self.config.name)
            .field("components", &self.component_names())
            .field("connections", &self.connections.len())
            .finish()
    }
}

/// Cloneable handle for terminating a network from outside its run.
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    name: String,
    active: Arc<Mutex<Option<Arc<RunTable>>>>,
}

impl NetworkHandle {
    /// Get the network name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the network is running.
    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Terminate the current run, nested subnets included.
    ///
    /// Queued packets are discarded and the run's `go()` returns `Ok(())`.
    /// Returns false if the network was not running.
    pub fn terminate(&self) -> bool {
        let table = self.active.lock().clone();
        match table {
            Some(table) => {
                tracing::info!(network = %self.name, "termination requested");
                table.terminate();
                true
            }
            None => false,
        }
    }
}
