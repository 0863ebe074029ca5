//! Component trait and related types.

use crate::context::Context;
use crate::error::Result;
use crate::port::PortSpec;
use std::future::Future;
use std::pin::Pin;

/// Metadata about a component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Type name (e.g., "Generate", "Zip", "WordCounter").
    pub type_name: String,
    /// Description of what the component does.
    pub description: String,
    /// Declared ports, inputs and outputs.
    pub ports: Vec<PortSpec>,
    /// Activate once at start even when inputs are connected.
    pub self_starting: bool,
    /// Activate once more after every input has drained.
    pub must_run: bool,
}

impl ComponentInfo {
    /// Create info for a component type with no ports.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: String::new(),
            ports: Vec::new(),
            self_starting: false,
            must_run: false,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Add a port.
    pub fn with_port(mut self, port: PortSpec) -> Self {
        self.ports.push(port);
        self
    }

    /// Add several ports.
    pub fn with_ports(mut self, ports: impl IntoIterator<Item = PortSpec>) -> Self {
        self.ports.extend(ports);
        self
    }

    /// Mark as self-starting.
    pub fn self_starting(mut self) -> Self {
        self.self_starting = true;
        self
    }

    /// Mark as must-run.
    pub fn must_run(mut self) -> Self {
        self.must_run = true;
        self
    }

    /// Get a port declaration by name.
    pub fn port(&self, name: &str) -> Option<&PortSpec> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Declared input ports.
    pub fn inputs(&self) -> impl Iterator<Item = &PortSpec> {
        self.ports.iter().filter(|p| p.is_input())
    }

    /// Declared output ports.
    pub fn outputs(&self) -> impl Iterator<Item = &PortSpec> {
        self.ports.iter().filter(|p| !p.is_input())
    }
}

/// The future returned by one activation of a component.
pub type ComponentFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A unit of user logic with named ports.
///
/// The runner calls `execute` once per activation. Every packet the
/// component holds when `execute` returns must have been sent, dropped,
/// attached to another packet or pushed onto the component's stack.
pub trait Component: Send {
    /// Get component metadata and port declarations.
    fn info(&self) -> ComponentInfo;

    /// Run one activation.
    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a>;
}
