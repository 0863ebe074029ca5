//! Output ports.

use crate::connection::{Connection, Delivery};
use crate::error::{Result, RivuletError};
use crate::packet::Packet;
use crate::scheduler::RunnerHandle;
use crate::shared::SharedState;
use crate::validator::TypeValidator;
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// The sending end of zero or more connections.
#[derive(Debug)]
pub struct OutputPort {
    name: String,
    validator: Option<Arc<dyn TypeValidator>>,
    targets: Vec<Arc<Connection>>,
    open: Mutex<Vec<bool>>,
}

impl OutputPort {
    /// Create an unconnected output port with its full name.
    pub fn new(name: impl Into<String>, validator: Option<Arc<dyn TypeValidator>>) -> Self {
        Self {
            name: name.into(),
            validator,
            targets: Vec::new(),
            open: Mutex::new(Vec::new()),
        }
    }

    /// Get the full port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if any connection is attached.
    pub fn is_connected(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Get the attached connections in attach order.
    pub fn targets(&self) -> &[Arc<Connection>] {
        &self.targets
    }

    /// Attach a connection and register as one of its senders.
    ///
    /// Returns false if the connection was already attached.
    pub fn attach(&mut self, conn: Arc<Connection>) -> bool {
        if self.targets.iter().any(|t| Arc::ptr_eq(t, &conn)) {
            return false;
        }
        conn.register_sender(self.name.clone());
        self.targets.push(conn);
        true
    }

    /// Mark every attachment open for a new run.
    pub fn open(&self) {
        *self.open.lock() = vec![true; self.targets.len()];
    }

    /// Check if every attachment has been closed.
    pub fn is_closed(&self) -> bool {
        !self.open.lock().iter().any(|open| *open)
    }

    /// Total backlog over all attached connections.
    pub fn backlog(&self) -> usize {
        self.targets.iter().map(|t| t.backlog()).sum()
    }

    /// Run the validator, if any, over a value.
    pub fn validate(&self, value: Value) -> Result<Value> {
        match &self.validator {
            Some(validator) => {
                validator
                    .validate(value)
                    .map_err(|cause| RivuletError::TypeValidation {
                        port: self.name.clone(),
                        validator: validator.name().to_string(),
                        cause,
                    })
            }
            None => Ok(value),
        }
    }

    /// Deliver a packet to every attached connection.
    ///
    /// Every connection after the first receives a duplicate. A delivery
    /// refused by a closed receiver disposes of that packet and stops this
    /// port sending there. Returns true only if every delivery succeeded.
    pub async fn send(
        &self,
        mut packet: Packet,
        runner: &RunnerHandle,
        shared: &SharedState,
        external: bool,
    ) -> Result<bool> {
        if packet.is_normal() && self.validator.is_some() {
            let content = std::mem::take(packet.content_mut());
            match self.validate(content) {
                Ok(content) => packet.set_content(content),
                Err(e) => {
                    // The packet already left its owner; it dies here.
                    shared.record_drop(packet.tree_size());
                    return Err(e);
                }
            }
        }

        if self.targets.is_empty() {
            shared.record_drop(packet.tree_size());
            debug!(
                port = %self.name,
                packet = %packet.id(),
                "dropping packet sent to unconnected port"
            );
            return Ok(false);
        }

        let mut packets = Vec::with_capacity(self.targets.len());
        for _ in 1..self.targets.len() {
            let copy = packet.duplicate();
            shared.record_create(copy.tree_size());
            packets.push(copy);
        }
        packets.insert(0, packet);

        let mut all_delivered = true;
        for (index, (conn, packet)) in self.targets.iter().zip(packets).enumerate() {
            if !self.is_open_at(index) {
                shared.record_drop(packet.tree_size());
                all_delivered = false;
                continue;
            }
            match conn.send(packet, runner, shared, external).await? {
                Delivery::Delivered => {}
                Delivery::Rejected(packet) => {
                    shared.record_drop(packet.tree_size());
                    debug!(
                        port = %self.name,
                        connection = %conn.target(),
                        "receiver closed, deregistering sender"
                    );
                    self.close_at(index);
                    all_delivered = false;
                }
            }
        }
        Ok(all_delivered)
    }

    /// Close every still-open attachment once.
    pub fn close(&self) {
        for index in 0..self.targets.len() {
            self.close_at(index);
        }
    }

    fn is_open_at(&self, index: usize) -> bool {
        self.open.lock().get(index).copied().unwrap_or(false)
    }

    fn close_at(&self, index: usize) {
        let was_open = {
            let mut open = self.open.lock();
            match open.get_mut(index) {
                Some(flag) => std::mem::replace(flag, false),
                None => false,
            }
        };
        if was_open {
            self.targets[index].close_sender();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;
    use crate::scheduler::{RunTable, RunnerState};
    use crate::validator::{JsonKind, JsonTypeValidator};

    fn runner() -> RunnerHandle {
        let table = RunTable::new("test");
        let runner = table.register("A");
        runner.set_state(RunnerState::Active);
        runner
    }

    #[tokio::test]
    async fn fan_out_clones_for_extra_targets() {
        let shared = SharedState::new();
        let runner = runner();
        let first = Arc::new(Connection::new("B.IN", 4, false));
        let second = Arc::new(Connection::new("C.IN", 4, false));
        let mut port = OutputPort::new("A.OUT", None);
        assert!(port.attach(Arc::clone(&first)));
        assert!(port.attach(Arc::clone(&second)));
        assert!(!port.attach(Arc::clone(&second)));
        first.open();
        second.open();
        port.open();

        let packet = Packet::new(Value::int(1), PacketKind::Normal, None);
        let original = packet.id();
        assert!(port.send(packet, &runner, &shared, false).await.unwrap());

        let a = first.try_receive(&shared).unwrap();
        let b = second.try_receive(&shared).unwrap();
        assert_eq!(a.id(), original);
        assert_ne!(b.id(), original);
        assert_eq!(a.content(), b.content());
        assert_eq!(shared.counters().creates, 1);
    }

    #[tokio::test]
    async fn rejected_delivery_deregisters_sender() {
        let shared = SharedState::new();
        let runner = runner();
        let conn = Arc::new(Connection::new("B.IN", 1, false));
        let mut port = OutputPort::new("A.OUT", None);
        port.attach(Arc::clone(&conn));
        conn.open();
        port.open();

        conn.close_receiver(&shared);
        let packet = Packet::new(Value::int(1), PacketKind::Normal, None);
        assert!(!port.send(packet, &runner, &shared, false).await.unwrap());
        assert!(port.is_closed());
        assert!(conn.is_closed());
        assert_eq!(shared.counters().drops, 1);
    }

    #[tokio::test]
    async fn validator_rejects_bad_content() {
        let shared = SharedState::new();
        let runner = runner();
        let validator = Arc::new(JsonTypeValidator::new(JsonKind::Int));
        let port = OutputPort::new("A.OUT", Some(validator));
        port.open();

        let packet = Packet::new(Value::string("x"), PacketKind::Normal, None);
        let err = port.send(packet, &runner, &shared, false).await.unwrap_err();
        assert_eq!(err.code(), "E113");
        // The rejected packet is gone and counted as such.
        assert_eq!(shared.counters().drops, 1);

        let bracket = Packet::new(Value::null(), PacketKind::Open, None);
        assert!(!port.send(bracket, &runner, &shared, false).await.unwrap());
    }
}
