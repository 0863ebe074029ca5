//! Graph building: components, connections and initial values.

use super::{EdgeRecord, Entry, InitialRecord, Network};
use rivulet_core::connection::{Connection, InitializationConnection};
use rivulet_core::error::{Result, RivuletError};
use rivulet_core::port::{InputPort, IntoPortRef, PortRef};
use rivulet_core::process::Process;
use rivulet_core::traits::Component;
use rivulet_core::value::Value;
use std::sync::Arc;
use tracing::debug;

/// Per-connection settings for [`Network::connect_with`].
///
/// Unset fields fall back to the network configuration, or to the settings
/// of the existing connection when the input port is already connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Queue capacity.
    pub capacity: Option<usize>,
    /// Evict the oldest packet instead of blocking a sender on a full queue.
    pub drop_oldest: Option<bool>,
}

impl ConnectionOptions {
    /// Options with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            drop_oldest: None,
        }
    }

    /// Set the eviction policy.
    pub fn drop_oldest(mut self, drop_oldest: bool) -> Self {
        self.drop_oldest = Some(drop_oldest);
        self
    }
}

impl Network {
    /// Add a component instance with no initial values.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        component: impl Component + 'static,
    ) -> Result<()> {
        self.add_boxed(name, Box::new(component))
    }

    /// Add a component instance and initialize some of its input ports.
    ///
    /// Initial values are keyed by port name (`"PORT"` or `"PORT[2]"`).
    pub fn add_component<K, V>(
        &mut self,
        name: impl Into<String>,
        component: impl Component + 'static,
        initial_values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let name = name.into();
        self.add_boxed(name.clone(), Box::new(component))?;
        self.initialize_all(&name, initial_values)
    }

    /// Add a component instance created by the registry.
    pub fn add_component_type<K, V>(
        &mut self,
        name: impl Into<String>,
        type_name: &str,
        initial_values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let registry = self
            .registry
            .clone()
            .ok_or_else(|| RivuletError::UnknownComponentType {
                type_name: type_name.to_string(),
            })?;
        let component = registry.create(type_name)?;
        let name = name.into();
        self.add_boxed(name.clone(), component)?;
        self.initialize_all(&name, initial_values)
    }

    /// Add an already boxed component instance.
    pub fn add_boxed(
        &mut self,
        name: impl Into<String>,
        component: Box<dyn Component>,
    ) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(RivuletError::DuplicateComponent { name });
        }
        if name.is_empty() {
            return Err(RivuletError::InvalidConfig {
                field: "component name".to_string(),
                cause: "must not be empty".to_string(),
            });
        }

        let info = component.info();
        let process = Process::new(name.clone(), &info);
        debug!(
            network = %self.config.name,
            component = %name,
            component_type = %info.type_name,
            "component added"
        );
        self.index.insert(name, self.entries.len());
        self.entries.push(Entry { process, component });
        Ok(())
    }

    fn initialize_all<K, V>(
        &mut self,
        name: &str,
        initial_values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (port, value) in initial_values {
            let target = PortRef::parse(&format!("{}.{}", name, port.as_ref()))?;
            self.initialize(value, target)?;
        }
        Ok(())
    }

    /// Connect an output port to an input port.
    ///
    /// Ports are given as references (`"Comp.PORT"`, `"Comp.PORT[3]"` or a
    /// [`PortRef`]). Connecting several outputs to one input shares a single
    /// connection whose capacity is fixed by the first connect; `capacity`
    /// defaults to the configured default.
    pub fn connect(
        &mut self,
        from: impl IntoPortRef,
        to: impl IntoPortRef,
        capacity: Option<usize>,
    ) -> Result<()> {
        self.connect_with(
            from,
            to,
            ConnectionOptions {
                capacity,
                drop_oldest: None,
            },
        )
    }

    /// Connect an output port to an input port with explicit options.
    pub fn connect_with(
        &mut self,
        from: impl IntoPortRef,
        to: impl IntoPortRef,
        options: ConnectionOptions,
    ) -> Result<()> {
        let from = from.into_port_ref()?;
        let to = to.into_port_ref()?;
        let default_capacity = self.config.default_capacity;
        let default_drop_oldest = self.config.drop_oldest;

        // Validate the sender before touching the receiver.
        self.entry_mut(&from.component)?
            .process
            .ports_mut()
            .output_mut(&from.port, from.index)?;

        let target = self.entry_mut(&to.component)?;
        let input = target.process.ports_mut().input_mut(&to.port, to.index)?;
        let (conn, created) = match input.connection() {
            Some(existing) => {
                if let Some(requested) = options.capacity {
                    if requested.max(1) != existing.capacity() {
                        return Err(RivuletError::CapacityMismatch {
                            component: to.component.clone(),
                            port: port_label(&to),
                            existing: existing.capacity(),
                            requested,
                        });
                    }
                }
                (Arc::clone(existing), false)
            }
            None => {
                if input.is_static() {
                    return Err(already_initialized(&to));
                }
                let conn = Arc::new(Connection::new(
                    input.name(),
                    options.capacity.unwrap_or(default_capacity),
                    options.drop_oldest.unwrap_or(default_drop_oldest),
                ));
                input.attach_connection(Arc::clone(&conn));
                (conn, true)
            }
        };

        let output = self
            .entry_mut(&from.component)?
            .process
            .ports_mut()
            .output_mut(&from.port, from.index)?;
        if !output.attach(Arc::clone(&conn)) {
            return Err(RivuletError::AlreadyConnected {
                component: to.component.clone(),
                port: port_label(&to),
            });
        }

        debug!(
            network = %self.config.name,
            connection = %conn.label(),
            capacity = conn.capacity(),
            drop_oldest = conn.drop_oldest(),
            "ports connected"
        );
        if created {
            self.connections.push(conn);
        }
        self.edges.push(EdgeRecord {
            from,
            to,
            capacity: options.capacity,
            drop_oldest: options.drop_oldest,
        });
        Ok(())
    }

    /// Feed an input port with a constant delivered once per activation.
    ///
    /// The value passes through the port's validator first. A port holds
    /// either a connection or an initial value, never both.
    pub fn initialize(&mut self, value: impl Into<Value>, to: impl IntoPortRef) -> Result<()> {
        let to = to.into_port_ref()?;
        let entry = self.entry_mut(&to.component)?;
        let validator = entry
            .process
            .ports()
            .spec(&to.port)
            .and_then(|spec| spec.validator.clone());
        let input: &mut InputPort = entry.process.ports_mut().input_mut(&to.port, to.index)?;

        if input.is_static() {
            return Err(already_initialized(&to));
        }
        if input.connection().is_some() {
            return Err(RivuletError::AlreadyConnected {
                component: to.component.clone(),
                port: port_label(&to),
            });
        }

        let value = value.into();
        let value = match validator {
            Some(validator) => {
                validator
                    .validate(value)
                    .map_err(|cause| RivuletError::TypeValidation {
                        port: input.name().to_string(),
                        validator: validator.name().to_string(),
                        cause,
                    })?
            }
            None => value,
        };

        input.attach_initializer(Arc::new(InitializationConnection::new(value.clone())));
        debug!(network = %self.config.name, port = %to, "port initialized");
        self.initials.push(InitialRecord { value, to });
        Ok(())
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Entry> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(RivuletError::ComponentNotFound {
                name: name.to_string(),
            }),
        }
    }
}

fn port_label(port: &PortRef) -> String {
    match port.index {
        Some(i) => format!("{}[{}]", port.port, i),
        None => port.port.clone(),
    }
}

fn already_initialized(port: &PortRef) -> RivuletError {
    RivuletError::AlreadyInitialized {
        component: port.component.clone(),
        port: port_label(port),
    }
}
