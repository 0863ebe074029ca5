//! Bounded FIFO connection between output ports and one input port.

use crate::error::Result;
use crate::packet::Packet;
use crate::scheduler::{RunnerHandle, RunnerState, Waiter};
use crate::shared::SharedState;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Outcome of a send.
#[derive(Debug)]
pub enum Delivery {
    /// The packet is queued.
    Delivered,
    /// The receiver is closed; the packet is handed back.
    Rejected(Packet),
}

#[derive(Debug, Default)]
struct ConnectionState {
    queue: VecDeque<Packet>,
    sources: Vec<String>,
    senders: usize,
    open_senders: usize,
    receiver_closed: bool,
    receiver: Option<Waiter>,
    blocked_senders: VecDeque<Waiter>,
}

impl ConnectionState {
    fn is_drained(&self) -> bool {
        self.queue.is_empty() && (self.open_senders == 0 || self.receiver_closed)
    }

    fn wake_receiver(&mut self) {
        if let Some(waiter) = self.receiver.take() {
            waiter.wake();
        }
    }

    fn wake_one_sender(&mut self) {
        while let Some(waiter) = self.blocked_senders.pop_front() {
            if waiter.wake() {
                break;
            }
        }
    }

    fn wake_all_senders(&mut self) {
        for waiter in self.blocked_senders.drain(..) {
            waiter.wake();
        }
    }
}

/// A bounded packet queue with backpressure.
///
/// The connection is closed once every registered sender has closed, and
/// drained once it is closed and empty.
#[derive(Debug)]
pub struct Connection {
    target: String,
    capacity: usize,
    drop_oldest: bool,
    state: Mutex<ConnectionState>,
}

impl Connection {
    /// Create a connection into the input port named `target`.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(target: impl Into<String>, capacity: usize, drop_oldest: bool) -> Self {
        Self {
            target: target.into(),
            capacity: capacity.max(1),
            drop_oldest,
            state: Mutex::new(ConnectionState::default()),
        }
    }

    /// Get the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if full sends evict the oldest packet instead of blocking.
    pub fn drop_oldest(&self) -> bool {
        self.drop_oldest
    }

    /// Get the receiving port name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Describe the connection as `sources -> target`.
    pub fn label(&self) -> String {
        self.label_of(&self.state.lock())
    }

    fn label_of(&self, state: &ConnectionState) -> String {
        if state.sources.is_empty() {
            self.target.clone()
        } else {
            format!("{} -> {}", state.sources.join(", "), self.target)
        }
    }

    /// Register one more sending port.
    pub fn register_sender(&self, source: impl Into<String>) {
        let mut state = self.state.lock();
        state.senders += 1;
        state.sources.push(source.into());
    }

    /// Number of registered senders.
    pub fn sender_count(&self) -> usize {
        self.state.lock().senders
    }

    /// Prepare for a run: every registered sender is open again.
    pub fn open(&self) {
        let mut state = self.state.lock();
        state.open_senders = state.senders;
        state.receiver_closed = false;
        state.receiver = None;
        state.blocked_senders.clear();
    }

    /// Number of queued packets.
    pub fn backlog(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Check if packets are queued.
    pub fn has_data(&self) -> bool {
        !self.state.lock().queue.is_empty()
    }

    /// Check if every sender has closed.
    pub fn is_closed(&self) -> bool {
        let state = self.state.lock();
        state.open_senders == 0 || state.receiver_closed
    }

    /// Check if closed and empty.
    pub fn is_drained(&self) -> bool {
        self.state.lock().is_drained()
    }

    /// Check if a receive would return without suspending.
    pub fn is_actionable(&self) -> bool {
        let state = self.state.lock();
        !state.queue.is_empty() || state.is_drained()
    }

    /// Queue a packet, suspending while the queue is full.
    ///
    /// With `drop_oldest` a full queue evicts its oldest packet instead.
    /// A closed receiver hands the packet back as [`Delivery::Rejected`].
    pub async fn send(
        &self,
        mut packet: Packet,
        runner: &RunnerHandle,
        shared: &SharedState,
        external: bool,
    ) -> Result<Delivery> {
        packet.clear_owner();
        loop {
            let waiter = {
                let mut state = self.state.lock();
                if state.receiver_closed {
                    return Ok(Delivery::Rejected(packet));
                }
                if state.queue.len() >= self.capacity && self.drop_oldest {
                    if let Some(evicted) = state.queue.pop_front() {
                        shared.record_drop(evicted.tree_size());
                        debug!(
                            connection = %self.target,
                            packet = %evicted.id(),
                            "evicted oldest packet from full connection"
                        );
                    }
                }
                if state.queue.len() < self.capacity {
                    state.queue.push_back(packet);
                    state.wake_receiver();
                    shared.record_send();
                    return Ok(Delivery::Delivered);
                }

                let label = self.label_of(&state);
                let waiter = runner.suspend(RunnerState::SuspSend, label, external)?;
                state.blocked_senders.push_back(waiter.clone());
                waiter
            };
            waiter.wait().await?;
        }
    }

    /// Take the next packet, suspending while open and empty.
    ///
    /// Returns `None` once drained.
    pub async fn receive(
        &self,
        runner: &RunnerHandle,
        shared: &SharedState,
        external: bool,
    ) -> Result<Option<Packet>> {
        loop {
            let waiter = {
                let mut state = self.state.lock();
                if let Some(packet) = state.queue.pop_front() {
                    state.wake_one_sender();
                    shared.record_receive();
                    return Ok(Some(packet));
                }
                if state.is_drained() {
                    return Ok(None);
                }
                let waiter = runner.suspend(RunnerState::SuspRecv, self.target.clone(), external)?;
                state.receiver = Some(waiter.clone());
                waiter
            };
            waiter.wait().await?;
        }
    }

    /// Take the next packet if one is queued.
    pub fn try_receive(&self, shared: &SharedState) -> Option<Packet> {
        let mut state = self.state.lock();
        let packet = state.queue.pop_front()?;
        state.wake_one_sender();
        shared.record_receive();
        Some(packet)
    }

    /// Register `waiter` to be woken on the next push or close.
    ///
    /// Returns false without registering if the connection is already
    /// actionable.
    pub fn register_receiver(&self, waiter: &Waiter) -> bool {
        let mut state = self.state.lock();
        if !state.queue.is_empty() || state.is_drained() {
            return false;
        }
        state.receiver = Some(waiter.clone());
        true
    }

    /// Close one sender. The last close wakes the receiver.
    pub fn close_sender(&self) {
        let mut state = self.state.lock();
        state.open_senders = state.open_senders.saturating_sub(1);
        if state.open_senders == 0 {
            state.wake_receiver();
        }
    }

    /// Close the receiving end.
    ///
    /// Queued packets are discarded and counted as dropped, blocked senders
    /// wake to find their packets rejected. Returns the number discarded.
    pub fn close_receiver(&self, shared: &SharedState) -> usize {
        let mut state = self.state.lock();
        state.receiver_closed = true;
        state.receiver = None;
        let discarded: usize = state.queue.drain(..).map(|p| p.tree_size()).sum();
        if discarded > 0 {
            shared.record_drop(discarded);
            warn!(
                connection = %self.target,
                count = discarded,
                "discarding queued packets on closed connection"
            );
        }
        state.wake_all_senders();
        discarded
    }
}
