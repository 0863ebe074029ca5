//! Connections between ports.
//!
//! - [`Connection`]: bounded FIFO queue with backpressure
//! - [`InitializationConnection`]: re-openable single constant

mod bounded;
mod initialization;

pub use bounded::{Connection, Delivery};
pub use initialization::InitializationConnection;
