//! Per-instance component state: identity, ports, stack and custody count.

use crate::error::{Result, RivuletError};
use crate::packet::{Owner, Packet};
use crate::port::{InputPort, Ports};
use crate::scheduler::Waiter;
use crate::shared::SharedState;
use crate::traits::ComponentInfo;
use crate::types::ComponentId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The runtime side of a component instance.
#[derive(Debug)]
pub struct Process {
    id: ComponentId,
    name: String,
    type_name: String,
    ports: Ports,
    stack: Mutex<Vec<Packet>>,
    owned: AtomicUsize,
    self_starting: bool,
    must_run: bool,
}

impl Process {
    /// Create the process for a component instance named `name`.
    pub fn new(name: impl Into<String>, info: &ComponentInfo) -> Self {
        let name = name.into();
        Self {
            id: ComponentId::next(),
            ports: Ports::new(&name, &info.ports),
            name,
            type_name: info.type_name.clone(),
            stack: Mutex::new(Vec::new()),
            owned: AtomicUsize::new(0),
            self_starting: info.self_starting,
            must_run: info.must_run,
        }
    }

    /// Get the component ID.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Get the full component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the component type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Get the ports.
    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Get the ports for wiring.
    pub fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    /// Check if declared self-starting.
    pub fn is_self_starting(&self) -> bool {
        self.self_starting
    }

    /// Check if declared must-run.
    pub fn is_must_run(&self) -> bool {
        self.must_run
    }

    /// Number of packets currently held.
    pub fn owned_count(&self) -> usize {
        self.owned.load(Ordering::Acquire)
    }

    /// Number of packets on the manual stack.
    pub fn stack_len(&self) -> usize {
        self.stack.lock().len()
    }

    /// Take custody of a packet.
    pub(crate) fn adopt(&self, mut packet: Packet) -> Packet {
        packet.set_owner(Owner::Component(self.id));
        self.owned.fetch_add(1, Ordering::AcqRel);
        packet
    }

    /// Give up custody of a packet held by this component.
    pub(crate) fn release(&self, packet: &mut Packet) -> Result<()> {
        self.check_owned(packet)?;
        packet.clear_owner();
        self.owned.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }

    pub(crate) fn check_owned(&self, packet: &Packet) -> Result<()> {
        if packet.is_owned_by(self.id) {
            Ok(())
        } else {
            Err(RivuletError::PacketNotOwned {
                component: self.name.clone(),
                packet: packet.id(),
            })
        }
    }

    pub(crate) fn push(&self, mut packet: Packet) -> Result<()> {
        self.release(&mut packet)?;
        self.stack.lock().push(packet);
        Ok(())
    }

    pub(crate) fn pop(&self) -> Option<Packet> {
        let packet = self.stack.lock().pop()?;
        Some(self.adopt(packet))
    }

    /// Reset the custody count at the start of a run.
    pub fn reset_owned(&self) {
        self.owned.store(0, Ordering::Release);
    }

    /// Empty the manual stack, counting its packets as dropped.
    pub fn clear_stack(&self, shared: &SharedState) -> usize {
        let packets: Vec<Packet> = std::mem::take(&mut *self.stack.lock());
        let count = packets.len();
        shared.record_drop(packets.iter().map(Packet::tree_size).sum());
        count
    }

    /// Connected inputs that are not fed by an initializer.
    pub fn data_inputs(&self) -> impl Iterator<Item = &InputPort> {
        self.ports
            .all_inputs()
            .filter(|p| p.is_connected() && !p.is_static())
    }

    /// Check if any input is fed by a connection.
    pub fn has_data_inputs(&self) -> bool {
        self.data_inputs().next().is_some()
    }

    /// Check if any data input has a packet ready.
    pub fn inputs_ready(&self) -> bool {
        self.data_inputs().any(InputPort::has_data)
    }

    /// Check if every data input has drained.
    pub fn inputs_drained(&self) -> bool {
        self.data_inputs().all(InputPort::is_drained)
    }

    /// Register `waiter` on every data input that is not drained.
    ///
    /// Returns false if some input turned out to be actionable already.
    pub fn register_dormant(&self, waiter: &Waiter) -> bool {
        self.data_inputs()
            .filter(|p| !p.is_drained())
            .all(|p| p.register_receiver(waiter))
    }

    /// Arm every initializer for this activation.
    pub fn open_static_inputs(&self) {
        for port in self.ports.all_inputs() {
            port.open_static();
        }
    }

    /// Disarm every initializer.
    pub fn close_static_inputs(&self) {
        for port in self.ports.all_inputs() {
            port.close_static();
        }
    }

    /// Open every output attachment for a new run.
    pub fn open_outputs(&self) {
        for port in self.ports.all_outputs() {
            port.open();
        }
    }

    /// Close every output port.
    pub fn close_outputs(&self) {
        for port in self.ports.all_outputs() {
            port.close();
        }
    }

    /// Close every input port, returning the number of discarded packets.
    pub fn close_inputs(&self, shared: &SharedState) -> usize {
        self.ports.all_inputs().map(|p| p.close(shared)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;
    use crate::port::PortSpec;
    use crate::value::Value;

    fn process() -> Process {
        let info = ComponentInfo::new("Test").with_port(PortSpec::input("IN").optional());
        Process::new("T", &info)
    }

    #[test]
    fn custody_counting() {
        let proc = process();
        let packet = proc.adopt(Packet::new(Value::int(1), PacketKind::Normal, None));
        assert_eq!(proc.owned_count(), 1);

        proc.push(packet).unwrap();
        assert_eq!(proc.owned_count(), 0);
        assert_eq!(proc.stack_len(), 1);

        let mut packet = proc.pop().unwrap();
        assert_eq!(proc.owned_count(), 1);
        proc.release(&mut packet).unwrap();
        assert_eq!(proc.owned_count(), 0);

        let err = proc.release(&mut packet).unwrap_err();
        assert_eq!(err.code(), "E402");
    }

    #[test]
    fn unconnected_inputs_are_not_data_inputs() {
        let proc = process();
        assert!(!proc.has_data_inputs());
        assert!(proc.inputs_drained());
        assert!(!proc.inputs_ready());
    }
}
