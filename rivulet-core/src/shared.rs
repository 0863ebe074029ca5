//! Network-wide shared state: globals and aggregate counters.

use crate::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate packet counters for one network run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Packets accepted into connections.
    pub sends: u64,
    /// Packets taken from connections or initializers.
    pub receives: u64,
    /// Packets created, clones and duplicates included.
    pub creates: u64,
    /// Packets dropped, discarded or evicted.
    pub drops: u64,
}

/// State shared by every component of a network, nested subnets included.
#[derive(Debug, Default)]
pub struct SharedState {
    globals: Mutex<HashMap<String, Value>>,
    counters: Mutex<Counters>,
}

impl SharedState {
    /// Create empty shared state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a global value.
    pub fn global(&self, key: &str) -> Option<Value> {
        self.globals.lock().get(key).cloned()
    }

    /// Set a global value, returning the previous one.
    pub fn set_global(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.globals.lock().insert(key.into(), value)
    }

    /// Snapshot of all globals.
    pub fn globals(&self) -> HashMap<String, Value> {
        self.globals.lock().clone()
    }

    /// Snapshot of the counters.
    pub fn counters(&self) -> Counters {
        *self.counters.lock()
    }

    /// Zero all counters.
    pub fn reset_counters(&self) {
        *self.counters.lock() = Counters::default();
    }

    /// Count `n` created packets.
    pub fn record_create(&self, n: usize) {
        self.counters.lock().creates += n as u64;
    }

    /// Count `n` dropped packets.
    pub fn record_drop(&self, n: usize) {
        self.counters.lock().drops += n as u64;
    }

    /// Count one delivered send.
    pub fn record_send(&self) {
        self.counters.lock().sends += 1;
    }

    /// Count one receive.
    pub fn record_receive(&self) {
        self.counters.lock().receives += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_reset() {
        let shared = SharedState::new();
        shared.record_create(3);
        shared.record_drop(2);
        shared.record_send();
        shared.record_receive();

        let c = shared.counters();
        assert_eq!((c.creates, c.drops, c.sends, c.receives), (3, 2, 1, 1));

        shared.reset_counters();
        assert_eq!(shared.counters(), Counters::default());
    }

    #[test]
    fn globals_roundtrip() {
        let shared = SharedState::new();
        assert!(shared.set_global("limit", Value::int(4)).is_none());
        assert_eq!(shared.global("limit"), Some(Value::int(4)));
        assert_eq!(shared.globals().len(), 1);
    }
}
