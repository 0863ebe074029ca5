//! Port handles bound to the calling component's context.
//!
//! Handles tie a runtime port to the component that uses it, so that packets
//! received are adopted by that component and packets sent are released
//! from its custody.

use super::{InputPort, OutputPort};
use crate::context::Context;
use crate::error::Result;
use crate::packet::{Packet, PacketKind};
use crate::scheduler::Waiter;
use crate::value::Value;
use futures::stream::{self, Stream};

/// An input port as seen by one component activation.
#[derive(Debug, Clone, Copy)]
pub struct InputHandle<'c> {
    port: &'c InputPort,
    ctx: &'c Context<'c>,
    external: bool,
}

impl<'c> InputHandle<'c> {
    pub(crate) fn new(port: &'c InputPort, ctx: &'c Context<'c>, external: bool) -> Self {
        Self {
            port,
            ctx,
            external,
        }
    }

    /// Get the full port name.
    pub fn name(&self) -> &str {
        self.port.name()
    }

    /// Get the underlying port.
    pub fn port(&self) -> &'c InputPort {
        self.port
    }

    /// Receive the next packet, or `None` once the port is drained.
    ///
    /// Suspends the runner while the connection is open but empty.
    pub async fn receive(&self) -> Result<Option<Packet>> {
        let packet = self
            .port
            .receive(self.ctx.runner(), self.ctx.shared(), self.external)
            .await?;
        Ok(packet.map(|p| self.ctx.adopt(p)))
    }

    /// Receive a packet only if one is ready.
    pub fn try_receive(&self) -> Option<Packet> {
        self.port
            .try_receive(self.ctx.shared())
            .map(|p| self.ctx.adopt(p))
    }

    /// Receive the next packet and drop it, returning its content.
    pub async fn receive_content(&self) -> Result<Option<Value>> {
        match self.receive().await? {
            Some(packet) => self.ctx.consume(packet).map(Some),
            None => Ok(None),
        }
    }

    /// Consume exactly one packet and close the port for good.
    ///
    /// Returns the packet's content, or `default` if the port was drained.
    pub async fn receive_once(&self, default: Value) -> Result<Value> {
        let value = self.receive_content().await?.unwrap_or(default);
        self.close();
        Ok(value)
    }

    /// Stream of received packets, ending at the first `None`.
    pub fn packets(self) -> impl Stream<Item = Result<Packet>> + 'c {
        stream::unfold(Some(self), |state| async move {
            let handle = state?;
            match handle.receive().await {
                Ok(Some(packet)) => Some((Ok(packet), Some(handle))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Stream of received contents, dropping each packet as it is yielded.
    pub fn contents(self) -> impl Stream<Item = Result<Value>> + 'c {
        stream::unfold(Some(self), |state| async move {
            let handle = state?;
            match handle.receive_content().await {
                Ok(Some(value)) => Some((Ok(value), Some(handle))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Close the port; anything still queued is discarded.
    pub fn close(&self) -> usize {
        self.port.close(self.ctx.shared())
    }

    /// Re-arm a static port for one more delivery.
    pub fn reopen(&self) {
        self.port.open_static();
    }

    /// Check if nothing more will arrive.
    pub fn is_drained(&self) -> bool {
        self.port.is_drained()
    }

    /// Check if a packet is ready.
    pub fn has_data(&self) -> bool {
        self.port.has_data()
    }

    /// Check if fed by an initializer.
    pub fn is_static(&self) -> bool {
        self.port.is_static()
    }

    /// Check if a connection or initializer is attached.
    pub fn is_connected(&self) -> bool {
        self.port.is_connected()
    }

    /// Number of queued packets.
    pub fn backlog(&self) -> usize {
        self.port.backlog()
    }

    pub(crate) fn is_external(&self) -> bool {
        self.external
    }

    pub(crate) fn register_receiver(&self, waiter: &Waiter) -> bool {
        self.port.register_receiver(waiter)
    }
}

/// An output port as seen by one component activation.
#[derive(Debug, Clone, Copy)]
pub struct OutputHandle<'c> {
    port: &'c OutputPort,
    ctx: &'c Context<'c>,
    external: bool,
}

impl<'c> OutputHandle<'c> {
    pub(crate) fn new(port: &'c OutputPort, ctx: &'c Context<'c>, external: bool) -> Self {
        Self {
            port,
            ctx,
            external,
        }
    }

    /// Get the full port name.
    pub fn name(&self) -> &str {
        self.port.name()
    }

    /// Get the underlying port.
    pub fn port(&self) -> &'c OutputPort {
        self.port
    }

    /// Send an owned packet.
    ///
    /// Returns false if any delivery failed; the packet has left this
    /// component's custody either way.
    pub async fn send(&self, mut packet: Packet) -> Result<bool> {
        self.ctx.release(&mut packet)?;
        self.port
            .send(packet, self.ctx.runner(), self.ctx.shared(), self.external)
            .await
    }

    /// Create a data packet and send it.
    pub async fn send_value(&self, content: impl Into<Value>) -> Result<bool> {
        let packet = self.ctx.create(content);
        self.send(packet).await
    }

    /// Send an opening bracket.
    pub async fn send_open(&self, content: impl Into<Value>) -> Result<bool> {
        let packet = self.ctx.create_bracket(PacketKind::Open, content);
        self.send(packet).await
    }

    /// Send a closing bracket.
    pub async fn send_close(&self, content: impl Into<Value>) -> Result<bool> {
        let packet = self.ctx.create_bracket(PacketKind::Close, content);
        self.send(packet).await
    }

    /// Close the port.
    pub fn close(&self) {
        self.port.close();
    }

    /// Check if any connection is attached.
    pub fn is_connected(&self) -> bool {
        self.port.is_connected()
    }

    /// Check if every attached connection stopped accepting.
    pub fn is_closed(&self) -> bool {
        self.port.is_closed()
    }

    /// Total backlog of the attached connections.
    pub fn backlog(&self) -> usize {
        self.port.backlog()
    }
}
