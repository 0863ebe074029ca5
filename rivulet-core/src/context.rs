//! Execution context handed to a component for each activation.

use crate::collections::{InputCollection, OutputCollection};
use crate::error::{Result, RivuletError};
use crate::packet::{Packet, PacketKind};
use crate::port::{InputHandle, OutputHandle};
use crate::process::Process;
use crate::scheduler::{RunnerHandle, RunnerState};
use crate::shared::SharedState;
use crate::types::{ComponentId, PacketId};
use crate::value::Value;
use std::future::Future;
use tracing::debug;

/// Everything a component can touch during an activation.
///
/// Packet operations are scoped to the calling component: only packets it
/// holds can be sent, dropped, attached, duplicated or pushed.
#[derive(Debug)]
pub struct Context<'a> {
    process: &'a Process,
    runner: RunnerHandle,
    shared: &'a SharedState,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    /// Create a context.
    ///
    /// `parent` is the context of the subnet component when the process
    /// runs inside a nested network.
    pub fn new(
        process: &'a Process,
        runner: RunnerHandle,
        shared: &'a SharedState,
        parent: Option<&'a Context<'a>>,
    ) -> Self {
        Self {
            process,
            runner,
            shared,
            parent,
        }
    }

    /// Get the component ID.
    pub fn id(&self) -> ComponentId {
        self.process.id()
    }

    /// Get the full component name.
    pub fn name(&self) -> &str {
        self.process.name()
    }

    /// Get the process.
    pub fn process(&self) -> &'a Process {
        self.process
    }

    /// Get the runner handle.
    pub fn runner(&self) -> &RunnerHandle {
        &self.runner
    }

    /// Get the network-wide shared state.
    pub fn shared(&self) -> &'a SharedState {
        self.shared
    }

    /// Get the enclosing subnet's context, if nested.
    pub fn parent(&self) -> Option<&'a Context<'a>> {
        self.parent
    }

    // ---------------------------------------------------------------------
    // Packet lifecycle
    // ---------------------------------------------------------------------

    /// Create a data packet owned by this component.
    pub fn create(&self, content: impl Into<Value>) -> Packet {
        self.create_bracket(PacketKind::Normal, content)
    }

    /// Create a packet of the given kind owned by this component.
    pub fn create_bracket(&self, kind: PacketKind, content: impl Into<Value>) -> Packet {
        self.shared.record_create(1);
        self.process.adopt(Packet::new(content.into(), kind, None))
    }

    /// Duplicate a held packet; the copy is also held by this component.
    pub fn duplicate(&self, packet: &Packet) -> Result<Packet> {
        self.process.check_owned(packet)?;
        let copy = packet.duplicate();
        self.shared.record_create(copy.tree_size());
        Ok(self.process.adopt(copy))
    }

    /// Drop a held packet together with its chains.
    pub fn drop(&self, mut packet: Packet) -> Result<()> {
        self.process.release(&mut packet)?;
        self.shared.record_drop(packet.tree_size());
        debug!(component = %self.name(), packet = %packet.id(), "packet dropped");
        Ok(())
    }

    /// Drop a held packet and return its content.
    pub fn consume(&self, mut packet: Packet) -> Result<Value> {
        self.process.release(&mut packet)?;
        self.shared.record_drop(packet.tree_size());
        Ok(packet.into_content())
    }

    /// Attach a held packet to a named chain of another held packet.
    pub fn attach(&self, target: &mut Packet, chain: &str, mut sub: Packet) -> Result<()> {
        self.process.check_owned(target)?;
        self.process.check_owned(&sub)?;
        if target.contains(sub.id()) || sub.contains(target.id()) {
            return Err(RivuletError::CyclicChain {
                packet: target.id(),
                subpacket: sub.id(),
            });
        }
        self.process.release(&mut sub)?;
        target.attach(chain, sub)
    }

    /// Detach a member from a chain of a held packet and take custody of it.
    pub fn detach(&self, target: &mut Packet, chain: &str, member: PacketId) -> Result<Packet> {
        self.process.check_owned(target)?;
        let sub = target.detach(chain, member)?;
        Ok(self.process.adopt(sub))
    }

    /// Number of packets this component holds right now.
    pub fn owned_count(&self) -> usize {
        self.process.owned_count()
    }

    pub(crate) fn adopt(&self, packet: Packet) -> Packet {
        self.process.adopt(packet)
    }

    pub(crate) fn release(&self, packet: &mut Packet) -> Result<()> {
        self.process.release(packet)
    }

    // ---------------------------------------------------------------------
    // Manual stack
    // ---------------------------------------------------------------------

    /// Park a held packet on the stack until a later activation.
    pub fn push(&self, packet: Packet) -> Result<()> {
        self.process.push(packet)
    }

    /// Take the most recently pushed packet back into custody.
    pub fn pop(&self) -> Option<Packet> {
        self.process.pop()
    }

    /// Number of packets on the stack.
    pub fn stack_len(&self) -> usize {
        self.process.stack_len()
    }

    // ---------------------------------------------------------------------
    // Ports
    // ---------------------------------------------------------------------

    /// Get a scalar input port.
    pub fn input(&self, name: &str) -> Result<InputHandle<'_>> {
        let port = self.process.ports().input(name)?;
        Ok(InputHandle::new(port, self, false))
    }

    /// Get an element of an array input port.
    pub fn input_at(&self, name: &str, index: usize) -> Result<InputHandle<'_>> {
        let port = self.process.ports().input_at(name, index)?;
        Ok(InputHandle::new(port, self, false))
    }

    /// Get every existing element of an array input port, by index.
    pub fn input_array(&self, name: &str) -> Result<Vec<InputHandle<'_>>> {
        let array = self.process.ports().input_array(name)?;
        Ok(array
            .iter()
            .map(|(_, port)| InputHandle::new(port, self, false))
            .collect())
    }

    /// Group scalar input ports for merge or zip receives.
    pub fn inputs(&self, names: &[&str]) -> Result<InputCollection<'_>> {
        let handles = names
            .iter()
            .map(|name| self.input(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(InputCollection::new(self, handles))
    }

    /// Group the elements of an array input port.
    pub fn input_collection(&self, name: &str) -> Result<InputCollection<'_>> {
        Ok(InputCollection::new(self, self.input_array(name)?))
    }

    /// Get a scalar output port.
    pub fn output(&self, name: &str) -> Result<OutputHandle<'_>> {
        let port = self.process.ports().output(name)?;
        Ok(OutputHandle::new(port, self, false))
    }

    /// Get an element of an array output port.
    pub fn output_at(&self, name: &str, index: usize) -> Result<OutputHandle<'_>> {
        let port = self.process.ports().output_at(name, index)?;
        Ok(OutputHandle::new(port, self, false))
    }

    /// Get every existing element of an array output port, by index.
    pub fn output_array(&self, name: &str) -> Result<Vec<OutputHandle<'_>>> {
        let array = self.process.ports().output_array(name)?;
        Ok(array
            .iter()
            .map(|(_, port)| OutputHandle::new(port, self, false))
            .collect())
    }

    /// Group scalar output ports for balanced or forked sends.
    pub fn outputs(&self, names: &[&str]) -> Result<OutputCollection<'_>> {
        let handles = names
            .iter()
            .map(|name| self.output(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(OutputCollection::new(self, handles))
    }

    /// Group the elements of an array output port.
    pub fn output_collection(&self, name: &str) -> Result<OutputCollection<'_>> {
        Ok(OutputCollection::new(self, self.output_array(name)?))
    }

    // ---------------------------------------------------------------------
    // Subnet boundary
    // ---------------------------------------------------------------------

    fn enclosing(&self) -> Result<&'a Context<'a>> {
        self.parent.ok_or_else(|| RivuletError::Execution {
            component: self.name().to_string(),
            cause: "boundary ports are only available inside a subnet".to_string(),
        })
    }

    /// Get an input port of the enclosing subnet component.
    ///
    /// Packets received through it are held by this component, and waits on
    /// it are reported as external to the nested network.
    pub fn boundary_input(&self, name: &str, index: Option<usize>) -> Result<InputHandle<'_>> {
        let ports = self.enclosing()?.process.ports();
        let port = match index {
            Some(i) => ports.input_at(name, i)?,
            None => ports.input(name)?,
        };
        Ok(InputHandle::new(port, self, true))
    }

    /// Get an output port of the enclosing subnet component.
    pub fn boundary_output(&self, name: &str, index: Option<usize>) -> Result<OutputHandle<'_>> {
        let ports = self.enclosing()?.process.ports();
        let port = match index {
            Some(i) => ports.output_at(name, i)?,
            None => ports.output(name)?,
        };
        Ok(OutputHandle::new(port, self, true))
    }

    // ---------------------------------------------------------------------
    // Globals, waits and failures
    // ---------------------------------------------------------------------

    /// Read a network-wide global.
    pub fn global(&self, key: &str) -> Option<Value> {
        self.shared.global(key)
    }

    /// Set a network-wide global, returning the previous value.
    pub fn set_global(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.shared.set_global(key, value.into())
    }

    /// Await slow external work without counting as blocked.
    ///
    /// The runner is exempt from deadlock detection while `fut` runs; the
    /// future itself is not cancelled by this marker.
    pub async fn long_wait<F: Future>(&self, fut: F) -> F::Output {
        self.runner.set_state(RunnerState::LongWait);
        let output = fut.await;
        self.runner.set_state(RunnerState::Active);
        output
    }

    /// Build an execution error attributed to this component.
    pub fn fail(&self, cause: impl Into<String>) -> RivuletError {
        RivuletError::Execution {
            component: self.name().to_string(),
            cause: cause.into(),
        }
    }
}
