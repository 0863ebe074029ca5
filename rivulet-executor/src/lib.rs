//! Rivulet Executor - network execution engine.
//!
//! This crate runs graphs of [`rivulet_core`] components:
//! - Per-component runners with the activation loop and custody checks
//! - Network building, supervision and deadlock detection
//! - Subnets with plain and substream-aware boundary adapters
//! - Component registry and graph document loader
//! - Closure-based functional components
//! - Tracing setup for binaries and tests
//!
//! # Example
//!
//! ```ignore
//! use rivulet_executor::prelude::*;
//!
//! let (sink, seen) = functional::collector();
//! let mut network = Network::new();
//! network.add("Gen", functional::values([1, 2, 3]))?;
//! network.add("Show", sink)?;
//! network.connect("Gen.OUT", "Show.IN", None)?;
//! network.go().await?;
//! assert_eq!(seen.lock().len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod functional;
mod loader;
pub mod network;
pub mod observability;
pub mod registry;
mod runner;
pub mod subnet;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::adapters::{SubIn, SubInSS, SubOut, SubOutSS};
    pub use crate::config::NetworkConfig;
    pub use crate::functional::{self, Collected, Sink, Source, Transform};
    pub use crate::network::{ConnectionOptions, Network, NetworkHandle};
    pub use crate::observability::{LogFormat, TracingConfig, init_tracing};
    pub use crate::registry::{ComponentFactory, ComponentRegistry};
    pub use crate::subnet::{Export, SubNet};
    pub use rivulet_core::prelude::*;
}
