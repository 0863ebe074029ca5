//! Prelude for convenient imports.
//!
//! ```ignore
//! use rivulet_core::prelude::*;
//! ```

// Core types
pub use crate::types::{ComponentId, PacketId, RunnerId};
pub use crate::value::Value;

// Error handling
pub use crate::error::{Result, ResultExt, RivuletError};

// Packets
pub use crate::packet::{Owner, Packet, PacketKind};

// Ports and connections
pub use crate::collections::{InputCollection, OutputCollection};
pub use crate::connection::{Connection, InitializationConnection};
pub use crate::port::{
    InputHandle, InputPort, IntoPortRef, OutputHandle, OutputPort, PortDirection, PortRef,
    PortSpec,
};
pub use crate::validator::{JsonKind, JsonTypeValidator, TypeValidator};

// Components
pub use crate::context::Context;
pub use crate::process::Process;
pub use crate::shared::{Counters, SharedState};
pub use crate::traits::{Component, ComponentFuture, ComponentInfo};

// Scheduling
pub use crate::scheduler::{BlockedRunner, RunStatus, RunTable, RunnerHandle, RunnerState};

// Documents
pub use crate::flow::{ConnectionDef, Endpoint, ExportDef, GraphDocument};
