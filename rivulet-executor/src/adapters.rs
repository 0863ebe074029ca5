//! Boundary adapters that move packets across a subnet boundary.
//!
//! Each exported port of a [`SubNet`](crate::subnet::SubNet) is served by one
//! adapter inside the nested network. Inbound adapters read the enclosing
//! component's input port and forward into the nested graph; outbound
//! adapters do the reverse. Waits on the enclosing ports are reported as
//! external so that the nested network does not mistake them for deadlock.

use rivulet_core::context::Context;
use rivulet_core::packet::PacketKind;
use rivulet_core::port::PortSpec;
use rivulet_core::traits::{Component, ComponentFuture, ComponentInfo};
use rivulet_core::value::Value;
use tracing::trace;

/// Adapter port carrying packets into the nested graph.
pub const ADAPTER_OUT: &str = "OUT";
/// Adapter port carrying packets out of the nested graph.
pub const ADAPTER_IN: &str = "IN";

/// Forwards every packet of an exported input port.
#[derive(Debug, Clone)]
pub struct SubIn {
    port: String,
}

impl SubIn {
    /// Create the adapter for the enclosing input port `port`.
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }
}

impl Component for SubIn {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("SubIn")
            .with_description("Forwards an exported input port into a subnet")
            .with_port(PortSpec::output(ADAPTER_OUT))
            .self_starting()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let outer = ctx.boundary_input(&self.port, None)?;
            let out = ctx.output(ADAPTER_OUT)?;
            while let Some(packet) = outer.receive().await? {
                out.send(packet).await?;
            }
            Ok(())
        })
    }
}

/// Forwards one substream of an exported input port, without its brackets.
///
/// The outermost OPEN and its matching CLOSE are dropped; nested brackets
/// pass through. A data packet arriving outside any bracket is forwarded on
/// its own as a one-packet substream.
#[derive(Debug, Clone)]
pub struct SubInSS {
    port: String,
}

impl SubInSS {
    /// Create the adapter for the enclosing input port `port`.
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }
}

impl Component for SubInSS {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("SubInSS")
            .with_description("Forwards one substream of an exported input port into a subnet")
            .with_port(PortSpec::output(ADAPTER_OUT))
            .self_starting()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let outer = ctx.boundary_input(&self.port, None)?;
            let out = ctx.output(ADAPTER_OUT)?;
            let mut depth = 0usize;

            while let Some(packet) = outer.receive().await? {
                match packet.kind() {
                    PacketKind::Open => {
                        depth += 1;
                        if depth == 1 {
                            ctx.drop(packet)?;
                            continue;
                        }
                    }
                    PacketKind::Close if depth <= 1 => {
                        trace!(port = %self.port, "substream closed");
                        ctx.drop(packet)?;
                        break;
                    }
                    PacketKind::Close => depth -= 1,
                    PacketKind::Normal if depth == 0 => {
                        out.send(packet).await?;
                        break;
                    }
                    PacketKind::Normal => {}
                }
                out.send(packet).await?;
            }
            Ok(())
        })
    }
}

/// Forwards everything that reaches it to an exported output port.
#[derive(Debug, Clone)]
pub struct SubOut {
    port: String,
}

impl SubOut {
    /// Create the adapter for the enclosing output port `port`.
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }
}

impl Component for SubOut {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("SubOut")
            .with_description("Forwards packets from a subnet to an exported output port")
            .with_port(PortSpec::input(ADAPTER_IN))
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input(ADAPTER_IN)?;
            let outer = ctx.boundary_output(&self.port, None)?;
            while let Some(packet) = input.receive().await? {
                outer.send(packet).await?;
            }
            Ok(())
        })
    }
}

/// Wraps everything produced by one nested run in an OPEN/CLOSE pair.
///
/// Runs even when nothing arrives, so every nested run yields exactly one
/// substream, possibly empty.
#[derive(Debug, Clone)]
pub struct SubOutSS {
    port: String,
}

impl SubOutSS {
    /// Create the adapter for the enclosing output port `port`.
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }
}

impl Component for SubOutSS {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("SubOutSS")
            .with_description("Wraps the packets of one subnet run in substream brackets")
            .with_port(PortSpec::input(ADAPTER_IN))
            .must_run()
    }

    fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
        Box::pin(async move {
            let input = ctx.input(ADAPTER_IN)?;
            let outer = ctx.boundary_output(&self.port, None)?;
            outer.send_open(Value::null()).await?;
            while let Some(packet) = input.receive().await? {
                outer.send(packet).await?;
            }
            outer.send_close(Value::null()).await?;
            Ok(())
        })
    }
}
