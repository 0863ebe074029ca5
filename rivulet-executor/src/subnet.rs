//! Subnets: components whose body is a nested network.
//!
//! Every exported port of a [`SubNet`] is declared on the subnet component
//! itself and served inside the nested network by an adapter named
//! `_in_NAME` or `_out_NAME`. Exports must be declared before the subnet is
//! added to an enclosing network, since its ports are fixed at that point.

use crate::adapters::{ADAPTER_IN, ADAPTER_OUT, SubIn, SubInSS, SubOut, SubOutSS};
use crate::network::Network;
use rivulet_core::context::Context;
use rivulet_core::error::{Result, RivuletError};
use rivulet_core::port::{IntoPortRef, PortDirection, PortRef, PortSpec};
use rivulet_core::traits::{Component, ComponentFuture, ComponentInfo};

/// One exported port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Name of the port on the subnet component.
    pub name: String,
    /// The inner port it is wired to.
    pub inner: PortRef,
    /// Direction of the exported port.
    pub direction: PortDirection,
    /// Whether the bracket-aware adapter serves it.
    pub substream: bool,
}

impl Export {
    /// Name of the adapter component inside the nested network.
    pub fn adapter_name(&self) -> String {
        match self.direction {
            PortDirection::Input => format!("_in_{}", self.name),
            PortDirection::Output => format!("_out_{}", self.name),
        }
    }
}

/// A component that runs a nested network once per activation.
#[derive(Debug)]
pub struct SubNet {
    info: ComponentInfo,
    network: Network,
    exports: Vec<Export>,
}

impl SubNet {
    /// Wrap `network` as a component of type `type_name`.
    pub fn new(type_name: impl Into<String>, network: Network) -> Self {
        Self {
            info: ComponentInfo::new(type_name),
            network,
            exports: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.info = self.info.with_description(desc);
        self
    }

    /// Get the nested network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Get the nested network for further wiring.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Exported ports in declaration order.
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Export the inner input port `inner` as input port `name`.
    pub fn export_input(&mut self, name: &str, inner: impl IntoPortRef) -> Result<()> {
        self.export(name, inner.into_port_ref()?, PortDirection::Input, false)
    }

    /// Export an inner input port, delivering one substream per nested run.
    pub fn export_input_substream(&mut self, name: &str, inner: impl IntoPortRef) -> Result<()> {
        self.export(name, inner.into_port_ref()?, PortDirection::Input, true)
    }

    /// Export the inner output port `inner` as output port `name`.
    pub fn export_output(&mut self, name: &str, inner: impl IntoPortRef) -> Result<()> {
        self.export(name, inner.into_port_ref()?, PortDirection::Output, false)
    }

    /// Export an inner output port, bracketing each nested run's output.
    pub fn export_output_substream(&mut self, name: &str, inner: impl IntoPortRef) -> Result<()> {
        self.export(name, inner.into_port_ref()?, PortDirection::Output, true)
    }

    fn export(
        &mut self,
        name: &str,
        inner: PortRef,
        direction: PortDirection,
        substream: bool,
    ) -> Result<()> {
        if self.info.port(name).is_some() {
            return Err(RivuletError::InvalidConfig {
                field: format!("{}.{}", self.info.type_name, name),
                cause: "port is already exported".to_string(),
            });
        }

        let required = self
            .network
            .process(&inner.component)
            .ok_or_else(|| RivuletError::ComponentNotFound {
                name: inner.component.clone(),
            })?
            .ports()
            .spec(&inner.port)
            .map(|spec| spec.required)
            .unwrap_or(false);

        let export = Export {
            name: name.to_string(),
            inner,
            direction,
            substream,
        };
        let adapter = export.adapter_name();
        let spec = match direction {
            PortDirection::Input => {
                if substream {
                    self.network.add(adapter.as_str(), SubInSS::new(name))?;
                } else {
                    self.network.add(adapter.as_str(), SubIn::new(name))?;
                }
                self.network.connect(
                    PortRef::new(adapter.as_str(), ADAPTER_OUT),
                    &export.inner,
                    None,
                )?;
                PortSpec::input(name)
            }
            PortDirection::Output => {
                if substream {
                    self.network.add(adapter.as_str(), SubOutSS::new(name))?;
                } else {
                    self.network.add(adapter.as_str(), SubOut::new(name))?;
                }
                self.network.connect(
                    &export.inner,
                    PortRef::new(adapter.as_str(), ADAPTER_IN),
                    None,
                )?;
                PortSpec::output(name)
            }
        };
        let spec = if required { spec.required() } else { spec.optional() };

        self.info.ports.push(spec);
        self.exports.push(export);
        Ok(())
    }
}

impl Component for SubNet {
    fn info(&self) -> ComponentInfo {
        self.info.clone()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(self.network.run_nested(ctx))
    }
}
