//! Single-value connection feeding a constant into an input port.

use crate::value::Value;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct InitState {
    open: bool,
    delivered: bool,
}

/// Re-openable connection holding one constant value.
///
/// Each [`open`](Self::open) arms it to deliver the value exactly once.
#[derive(Debug)]
pub struct InitializationConnection {
    value: Value,
    state: Mutex<InitState>,
}

impl InitializationConnection {
    /// Create a closed initializer for `value`.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            state: Mutex::new(InitState::default()),
        }
    }

    /// Get the constant.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Arm the initializer for one more delivery.
    pub fn open(&self) {
        let mut state = self.state.lock();
        state.open = true;
        state.delivered = false;
    }

    /// Close without delivering.
    pub fn close(&self) {
        self.state.lock().open = false;
    }

    /// Take the constant if armed; the initializer closes afterwards.
    pub fn take(&self) -> Option<Value> {
        let mut state = self.state.lock();
        if !state.open || state.delivered {
            return None;
        }
        state.delivered = true;
        state.open = false;
        Some(self.value.clone())
    }

    /// Check if armed and not yet delivered.
    pub fn has_data(&self) -> bool {
        let state = self.state.lock();
        state.open && !state.delivered
    }

    /// Check if there is nothing left to deliver.
    pub fn is_drained(&self) -> bool {
        !self.has_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_once_per_open() {
        let init = InitializationConnection::new(Value::string("cfg"));
        assert!(init.is_drained());
        assert!(init.take().is_none());

        init.open();
        assert!(init.has_data());
        assert_eq!(init.take(), Some(Value::string("cfg")));
        assert!(init.take().is_none());
        assert!(init.is_drained());

        init.open();
        assert_eq!(init.take(), Some(Value::string("cfg")));
    }

    #[test]
    fn close_disarms() {
        let init = InitializationConnection::new(Value::int(1));
        init.open();
        init.close();
        assert!(init.take().is_none());
    }
}
