//! Building networks from graph documents and exporting them back.

use crate::config::NetworkConfig;
use crate::network::{ConnectionOptions, Network};
use crate::registry::ComponentRegistry;
use crate::subnet::SubNet;
use rivulet_core::error::Result;
use rivulet_core::flow::{ConnectionDef, Endpoint, ExportDef, GraphDocument, Metadata, ProcessDef};
use rivulet_core::port::PortDirection;
use rivulet_core::value::Value;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

impl Network {
    /// Build a network from a document, creating components by type name.
    ///
    /// The network is named after the document's `properties.name` when set.
    pub fn from_document(
        document: &GraphDocument,
        registry: Arc<ComponentRegistry>,
    ) -> Result<Self> {
        let mut config = NetworkConfig::from_env();
        if let Some(name) = document.name() {
            config = config.with_name(name);
        }
        build_network(document, config, &registry, &mut Vec::new())
    }

    /// Export the graph as a document.
    ///
    /// Exported ports are not known to a plain network; see
    /// [`SubNet::to_document`].
    pub fn to_document(&self) -> GraphDocument {
        let mut document = GraphDocument::default();
        document
            .properties
            .insert("name".to_string(), JsonValue::String(self.name().to_string()));

        for name in self.component_names() {
            if let Some(process) = self.process(name) {
                document.processes.insert(
                    name.to_string(),
                    ProcessDef {
                        component: process.type_name().to_string(),
                        metadata: Metadata::new(),
                    },
                );
            }
        }

        for initial in self.initial_records() {
            document.connections.push(ConnectionDef::Initial {
                data: initial.value.inner().clone(),
                tgt: Endpoint::from(&initial.to),
                metadata: Metadata::new(),
            });
        }
        for edge in self.edge_records() {
            let mut metadata = Metadata::new();
            if let Some(capacity) = edge.capacity {
                metadata.insert("capacity".to_string(), JsonValue::from(capacity));
            }
            if let Some(drop_oldest) = edge.drop_oldest {
                metadata.insert("drop_oldest".to_string(), JsonValue::Bool(drop_oldest));
            }
            document.connections.push(ConnectionDef::Edge {
                src: Endpoint::from(&edge.from),
                tgt: Endpoint::from(&edge.to),
                metadata,
            });
        }
        document
    }
}

impl SubNet {
    /// Build a subnet of type `type_name` from a document.
    pub fn from_document(
        type_name: &str,
        document: &GraphDocument,
        registry: Arc<ComponentRegistry>,
    ) -> Result<Self> {
        build_subnet(type_name, document, &registry, &mut vec![type_name.to_string()])
    }

    /// Export the nested graph as a document, exported ports included.
    ///
    /// Boundary adapters are left out; exports point at the inner ports.
    pub fn to_document(&self) -> GraphDocument {
        let mut document = self.network().to_document();
        for export in self.exports() {
            let adapter = export.adapter_name();
            document.processes.remove(&adapter);
            document.connections.retain(|conn| match conn {
                ConnectionDef::Edge { src, tgt, .. } => {
                    src.process != adapter && tgt.process != adapter
                }
                ConnectionDef::Initial { .. } => true,
            });

            let mut metadata = Metadata::new();
            if export.substream {
                metadata.insert("substream".to_string(), JsonValue::Bool(true));
            }
            let def = ExportDef {
                process: export.inner.component.clone(),
                port: export.inner.port.clone(),
                index: export.inner.index,
                metadata,
            };
            match export.direction {
                PortDirection::Input => document.inports.insert(export.name.clone(), def),
                PortDirection::Output => document.outports.insert(export.name.clone(), def),
            };
        }
        document
    }
}

pub(crate) fn build_subnet(
    type_name: &str,
    document: &GraphDocument,
    registry: &Arc<ComponentRegistry>,
    building: &mut Vec<String>,
) -> Result<SubNet> {
    let config = NetworkConfig::from_env().with_name(document.name().unwrap_or(type_name));
    let network = build_network(document, config, registry, building)?;

    let mut subnet = SubNet::new(type_name, network);
    if let Some(JsonValue::String(desc)) = document.properties.get("description") {
        subnet = subnet.with_description(desc.clone());
    }
    for (name, export) in &document.inports {
        let inner = export.endpoint().to_port_ref();
        if export.is_substream() {
            subnet.export_input_substream(name, inner)?;
        } else {
            subnet.export_input(name, inner)?;
        }
    }
    for (name, export) in &document.outports {
        let inner = export.endpoint().to_port_ref();
        if export.is_substream() {
            subnet.export_output_substream(name, inner)?;
        } else {
            subnet.export_output(name, inner)?;
        }
    }
    Ok(subnet)
}

fn build_network(
    document: &GraphDocument,
    config: NetworkConfig,
    registry: &Arc<ComponentRegistry>,
    building: &mut Vec<String>,
) -> Result<Network> {
    document.validate()?;
    let mut network = Network::with_config(config).with_registry(Arc::clone(registry));

    for (name, process) in &document.processes {
        let component = registry.create_nested(&process.component, building)?;
        network.add_boxed(name.clone(), component)?;
    }

    for conn in &document.connections {
        match conn {
            ConnectionDef::Edge { src, tgt, .. } => {
                let options = ConnectionOptions {
                    capacity: conn.capacity(),
                    drop_oldest: conn.drop_oldest(),
                };
                network.connect_with(src.to_port_ref(), tgt.to_port_ref(), options)?;
            }
            ConnectionDef::Initial { data, tgt, .. } => {
                network.initialize(Value::from(data.clone()), tgt.to_port_ref())?;
            }
        }
    }

    debug!(
        network = %network.name(),
        components = network.len(),
        connections = network.connection_count(),
        "network loaded from document"
    );
    Ok(network)
}
