//! Serialized graph documents.
//!
//! The document shape is the one exchanged with graph editors: named
//! processes, edges and initial values, plus the ports a graph exports when
//! it is used as a subnet.

use crate::error::{Result, RivuletError};
use crate::port::PortRef;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Free-form metadata attached to document entries.
pub type Metadata = BTreeMap<String, JsonValue>;

/// A complete graph document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Graph-level properties (name, description, ...).
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub properties: Metadata,
    /// Component instances by name.
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessDef>,
    /// Edges and initial values.
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
    /// Exported input ports by external name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inports: BTreeMap<String, ExportDef>,
    /// Exported output ports by external name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outports: BTreeMap<String, ExportDef>,
}

/// A component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDef {
    /// Component type name.
    pub component: String,
    /// Editor metadata.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// One port of one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Process name.
    pub process: String,
    /// Port name.
    pub port: String,
    /// Element index for array ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(process: impl Into<String>, port: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            process: process.into(),
            port: port.into(),
            index,
        }
    }

    /// Convert to a port reference.
    pub fn to_port_ref(&self) -> PortRef {
        PortRef {
            component: self.process.clone(),
            port: self.port.clone(),
            index: self.index,
        }
    }
}

impl From<&PortRef> for Endpoint {
    fn from(r: &PortRef) -> Self {
        Self::new(r.component.clone(), r.port.clone(), r.index)
    }
}

/// An edge or an initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionDef {
    /// Connection from an output port to an input port.
    Edge {
        /// Sending port.
        src: Endpoint,
        /// Receiving port.
        tgt: Endpoint,
        /// Edge metadata; `capacity` and `drop_oldest` are honored.
        #[serde(default, skip_serializing_if = "Metadata::is_empty")]
        metadata: Metadata,
    },
    /// Initial value for an input port.
    Initial {
        /// The constant.
        data: JsonValue,
        /// Receiving port.
        tgt: Endpoint,
        /// Editor metadata.
        #[serde(default, skip_serializing_if = "Metadata::is_empty")]
        metadata: Metadata,
    },
}

impl ConnectionDef {
    /// Get the receiving endpoint.
    pub fn target(&self) -> &Endpoint {
        match self {
            Self::Edge { tgt, .. } | Self::Initial { tgt, .. } => tgt,
        }
    }

    /// Requested connection capacity from edge metadata.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Edge { metadata, .. } => metadata
                .get("capacity")
                .and_then(JsonValue::as_u64)
                .map(|c| c as usize),
            Self::Initial { .. } => None,
        }
    }

    /// Requested drop-oldest policy from edge metadata.
    pub fn drop_oldest(&self) -> Option<bool> {
        match self {
            Self::Edge { metadata, .. } => metadata.get("drop_oldest").and_then(JsonValue::as_bool),
            Self::Initial { .. } => None,
        }
    }
}

/// An exported port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDef {
    /// Inner process name.
    pub process: String,
    /// Inner port name.
    pub port: String,
    /// Element index for array ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Editor metadata; `substream: true` selects the bracket-aware adapter.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl ExportDef {
    /// Get the inner endpoint.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.process.clone(), self.port.clone(), self.index)
    }

    /// Check if the export is bracket-aware.
    pub fn is_substream(&self) -> bool {
        self.metadata
            .get("substream")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }
}

impl GraphDocument {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Graph name from `properties.name`.
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(JsonValue::as_str)
    }

    /// Check that every endpoint names a declared process.
    pub fn validate(&self) -> Result<()> {
        let check = |endpoint: &Endpoint| {
            if self.processes.contains_key(&endpoint.process) {
                Ok(())
            } else {
                Err(RivuletError::ComponentNotFound {
                    name: endpoint.process.clone(),
                })
            }
        };

        for conn in &self.connections {
            if let ConnectionDef::Edge { src, .. } = conn {
                check(src)?;
            }
            check(conn.target())?;
        }
        for export in self.inports.values().chain(self.outports.values()) {
            check(&export.endpoint())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "properties": {"name": "counter"},
        "processes": {
            "Read": {"component": "ReadLines"},
            "Count": {"component": "Counter", "metadata": {"x": 10}}
        },
        "connections": [
            {"data": "input.txt", "tgt": {"process": "Read", "port": "FILE"}},
            {"src": {"process": "Read", "port": "OUT"},
             "tgt": {"process": "Count", "port": "IN", "index": 1},
             "metadata": {"capacity": 3}}
        ],
        "outports": {
            "COUNT": {"process": "Count", "port": "OUT"}
        }
    }"#;

    #[test]
    fn parses_edges_and_initials() {
        let doc = GraphDocument::from_json(DOC).unwrap();
        assert_eq!(doc.name(), Some("counter"));
        assert_eq!(doc.processes["Count"].component, "Counter");
        assert_eq!(doc.connections.len(), 2);

        match &doc.connections[0] {
            ConnectionDef::Initial { data, tgt, .. } => {
                assert_eq!(data, "input.txt");
                assert_eq!(tgt.port, "FILE");
            }
            other => panic!("expected initial, got {:?}", other),
        }
        assert_eq!(doc.connections[1].capacity(), Some(3));
        assert_eq!(doc.connections[1].target().to_port_ref().to_string(), "Count.IN[1]");
        assert!(!doc.outports["COUNT"].is_substream());
    }

    #[test]
    fn serializes_back_to_same_document() {
        let doc = GraphDocument::from_json(DOC).unwrap();
        let text = doc.to_json_pretty().unwrap();
        assert_eq!(GraphDocument::from_json(&text).unwrap(), doc);
    }

    #[test]
    fn rejects_unknown_processes() {
        let text = r#"{"processes": {}, "connections": [
            {"data": 1, "tgt": {"process": "Ghost", "port": "IN"}}
        ]}"#;
        let err = GraphDocument::from_json(text).unwrap_err();
        assert_eq!(err.code(), "E102");

        let err = GraphDocument::from_json("{ nope").unwrap_err();
        assert_eq!(err.code(), "E801");
    }
}
