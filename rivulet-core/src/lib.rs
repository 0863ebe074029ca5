//! Rivulet Core Library
//!
//! This crate provides the building blocks of the Rivulet flow-based
//! programming runtime: packets, ports, bounded connections, the component
//! contract and the run table that tracks every runner's suspension state.
//!
//! # Key Components
//!
//! - **Packet**: move-only unit of data with explicit custody
//! - **Connection**: bounded FIFO with backpressure and optional eviction
//! - **Ports**: scalar or array endpoints, with context-bound handles
//! - **Component**: user logic executed once per activation
//! - **RunTable**: suspension/wakeup bookkeeping and deadlock status
//!
//! # Example
//!
//! ```ignore
//! use rivulet_core::prelude::*;
//!
//! struct Double;
//!
//! impl Component for Double {
//!     fn info(&self) -> ComponentInfo {
//!         ComponentInfo::new("Double")
//!             .with_port(PortSpec::input("IN"))
//!             .with_port(PortSpec::output("OUT"))
//!     }
//!
//!     fn execute<'a>(&'a mut self, ctx: &'a Context<'a>) -> ComponentFuture<'a> {
//!         Box::pin(async move {
//!             let input = ctx.input("IN")?;
//!             let output = ctx.output("OUT")?;
//!             while let Some(n) = input.receive_content().await? {
//!                 output.send_value(n.as_i64().unwrap_or(0) * 2).await?;
//!             }
//!             Ok(())
//!         })
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod connection;
pub mod context;
pub mod error;
pub mod flow;
pub mod packet;
pub mod port;
pub mod prelude;
pub mod process;
pub mod scheduler;
pub mod shared;
pub mod traits;
pub mod types;
pub mod validator;
pub mod value;

// Re-export key types at crate root for convenience
pub use context::Context;
pub use error::{Result, RivuletError};
pub use flow::GraphDocument;
pub use packet::{Owner, Packet, PacketKind};
pub use process::Process;
pub use traits::{Component, ComponentFuture, ComponentInfo};
pub use types::{ComponentId, PacketId, RunnerId};
pub use value::Value;
