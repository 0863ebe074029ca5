//! Input ports.

use crate::connection::{Connection, InitializationConnection};
use crate::error::Result;
use crate::packet::{Packet, PacketKind};
use crate::scheduler::{RunnerHandle, Waiter};
use crate::shared::SharedState;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
enum InputSource {
    #[default]
    Unconnected,
    Connection(Arc<Connection>),
    Initializer(Arc<InitializationConnection>),
}

/// The receiving end of a connection or initializer.
#[derive(Debug)]
pub struct InputPort {
    name: String,
    source: InputSource,
}

impl InputPort {
    /// Create an unconnected input port with its full name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: InputSource::Unconnected,
        }
    }

    /// Get the full port name (`Comp.PORT` or `Comp.PORT[i]`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if a connection or initializer is attached.
    pub fn is_connected(&self) -> bool {
        !matches!(self.source, InputSource::Unconnected)
    }

    /// Check if fed by an initializer.
    pub fn is_static(&self) -> bool {
        matches!(self.source, InputSource::Initializer(_))
    }

    /// Get the attached connection.
    pub fn connection(&self) -> Option<&Arc<Connection>> {
        match &self.source {
            InputSource::Connection(conn) => Some(conn),
            _ => None,
        }
    }

    /// Get the attached initializer.
    pub fn initializer(&self) -> Option<&Arc<InitializationConnection>> {
        match &self.source {
            InputSource::Initializer(init) => Some(init),
            _ => None,
        }
    }

    /// Feed this port from a connection.
    pub fn attach_connection(&mut self, conn: Arc<Connection>) {
        self.source = InputSource::Connection(conn);
    }

    /// Feed this port from an initializer.
    pub fn attach_initializer(&mut self, init: Arc<InitializationConnection>) {
        self.source = InputSource::Initializer(init);
    }

    /// Arm the initializer, if any, for one more delivery.
    pub fn open_static(&self) {
        if let InputSource::Initializer(init) = &self.source {
            init.open();
        }
    }

    /// Disarm the initializer, if any.
    pub fn close_static(&self) {
        if let InputSource::Initializer(init) = &self.source {
            init.close();
        }
    }

    /// Receive the next packet, suspending the runner while open and empty.
    ///
    /// The packet comes back unowned; the caller adopts it.
    pub async fn receive(
        &self,
        runner: &RunnerHandle,
        shared: &SharedState,
        external: bool,
    ) -> Result<Option<Packet>> {
        match &self.source {
            InputSource::Connection(conn) => conn.receive(runner, shared, external).await,
            _ => Ok(self.try_receive(shared)),
        }
    }

    /// Receive a packet if one is available now.
    pub fn try_receive(&self, shared: &SharedState) -> Option<Packet> {
        match &self.source {
            InputSource::Unconnected => None,
            InputSource::Connection(conn) => conn.try_receive(shared),
            InputSource::Initializer(init) => {
                let value = init.take()?;
                shared.record_create(1);
                shared.record_receive();
                Some(Packet::new(value, PacketKind::Normal, None))
            }
        }
    }

    /// Register a waiter for the next push or close.
    ///
    /// Returns false if a receive would not suspend.
    pub fn register_receiver(&self, waiter: &Waiter) -> bool {
        match &self.source {
            InputSource::Connection(conn) => conn.register_receiver(waiter),
            _ => false,
        }
    }

    /// Close the port: queued packets are discarded, initializers disarmed.
    ///
    /// Returns the number of discarded packets.
    pub fn close(&self, shared: &SharedState) -> usize {
        match &self.source {
            InputSource::Unconnected => 0,
            InputSource::Connection(conn) => conn.close_receiver(shared),
            InputSource::Initializer(init) => {
                init.close();
                0
            }
        }
    }

    /// Check if nothing more will arrive.
    pub fn is_drained(&self) -> bool {
        match &self.source {
            InputSource::Unconnected => true,
            InputSource::Connection(conn) => conn.is_drained(),
            InputSource::Initializer(init) => init.is_drained(),
        }
    }

    /// Check if a packet is ready.
    pub fn has_data(&self) -> bool {
        match &self.source {
            InputSource::Unconnected => false,
            InputSource::Connection(conn) => conn.has_data(),
            InputSource::Initializer(init) => init.has_data(),
        }
    }

    /// Number of queued packets.
    pub fn backlog(&self) -> usize {
        match &self.source {
            InputSource::Connection(conn) => conn.backlog(),
            InputSource::Initializer(init) => usize::from(init.has_data()),
            InputSource::Unconnected => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn unconnected_port_is_drained() {
        let port = InputPort::new("A.IN");
        assert!(!port.is_connected());
        assert!(port.is_drained());
        assert!(port.try_receive(&SharedState::new()).is_none());
    }

    #[test]
    fn static_port_redelivers_after_open() {
        let shared = SharedState::new();
        let mut port = InputPort::new("A.CONF");
        port.attach_initializer(Arc::new(InitializationConnection::new(Value::int(9))));
        assert!(port.is_static());
        assert!(port.is_drained());

        for _ in 0..2 {
            port.open_static();
            let packet = port.try_receive(&shared).unwrap();
            assert_eq!(packet.content(), &Value::int(9));
            assert!(port.is_drained());
        }
        assert_eq!(shared.counters().creates, 2);
    }
}
