//! Error types for Rivulet.
//!
//! Every error carries a stable code (`E1xx` configuration, `E3xx` runtime,
//! `E4xx` packet discipline, `E5xx` deadlock, `E8xx` serialization) and the
//! names of the components and ports involved.

use crate::scheduler::BlockedRunner;
use crate::types::PacketId;
use thiserror::Error;

/// The main error type for Rivulet operations.
#[derive(Error, Debug)]
pub enum RivuletError {
    // =========================================================================
    // Configuration Errors (E101-E199)
    // =========================================================================
    /// A component with the same name is already registered.
    #[error("E101: Component '{name}' already exists in the network")]
    DuplicateComponent {
        /// The duplicated name.
        name: String,
    },

    /// No component with the given name is registered.
    #[error("E102: Component '{name}' not found")]
    ComponentNotFound {
        /// The missing component name.
        name: String,
    },

    /// A component has no port with the given name.
    #[error("E103: Component '{component}' has no port '{port}'")]
    PortNotFound {
        /// The component name.
        component: String,
        /// The missing port name.
        port: String,
    },

    /// A port reference string could not be parsed.
    #[error("E104: Invalid port reference '{reference}': {cause}")]
    InvalidPortReference {
        /// The offending reference text.
        reference: String,
        /// Why the reference is invalid.
        cause: String,
    },

    /// A port was used in the wrong direction.
    #[error("E105: Port '{component}.{port}' is not an {expected} port")]
    PortDirection {
        /// The component name.
        component: String,
        /// The port name.
        port: String,
        /// The direction that was required ("input" or "output").
        expected: &'static str,
    },

    /// A required port has neither a connection nor an initializer.
    #[error("E106: Required port '{component}.{port}' is not connected")]
    MissingRequiredPort {
        /// The component name.
        component: String,
        /// The port name.
        port: String,
    },

    /// The input port already has an initial value.
    #[error("E107: Port '{component}.{port}' is already initialized")]
    AlreadyInitialized {
        /// The component name.
        component: String,
        /// The port name.
        port: String,
    },

    /// The input port already has a live connection.
    #[error("E108: Port '{component}.{port}' is already connected")]
    AlreadyConnected {
        /// The component name.
        component: String,
        /// The port name.
        port: String,
    },

    /// A later connect disagreed with the capacity fixed by the first one.
    #[error(
        "E109: Connection into '{component}.{port}' has capacity {existing}, requested {requested}"
    )]
    CapacityMismatch {
        /// The receiving component name.
        component: String,
        /// The receiving port name.
        port: String,
        /// The capacity fixed by the first connect.
        existing: usize,
        /// The capacity requested by the conflicting connect.
        requested: usize,
    },

    /// An array port index is outside the declared fixed size.
    #[error("E110: Index {index} out of range for array port '{component}.{port}' (size {size})")]
    PortIndexOutOfRange {
        /// The component name.
        component: String,
        /// The port name.
        port: String,
        /// The requested element index.
        index: usize,
        /// The declared fixed size.
        size: usize,
    },

    /// A scalar port was addressed as an array, or the other way round.
    #[error("E111: Port '{component}.{port}' shape mismatch: {cause}")]
    PortShape {
        /// The component name.
        component: String,
        /// The port name.
        port: String,
        /// Description of the mismatch.
        cause: String,
    },

    /// The registry has no constructor for a component type.
    #[error("E112: Unknown component type '{type_name}'")]
    UnknownComponentType {
        /// The requested type name.
        type_name: String,
    },

    /// A value was rejected by a port's type validator.
    #[error("E113: Value rejected by validator '{validator}' on port '{port}': {cause}")]
    TypeValidation {
        /// The full port name.
        port: String,
        /// The validator name.
        validator: String,
        /// The validator's message.
        cause: String,
    },

    /// Invalid configuration value.
    #[error("E114: Invalid configuration for '{field}': {cause}")]
    InvalidConfig {
        /// The configuration field.
        field: String,
        /// Why the value is invalid.
        cause: String,
    },

    // =========================================================================
    // Runtime Errors (E301-E399)
    // =========================================================================
    /// A component's body failed.
    #[error("E301: Component '{component}' failed: {cause}")]
    Execution {
        /// The component name.
        component: String,
        /// Reason for the failure.
        cause: String,
    },

    /// The run was terminated while the caller was suspended.
    #[error("E302: Network terminated")]
    Terminated,

    // =========================================================================
    // Packet Discipline Errors (E401-E499)
    // =========================================================================
    /// A component still owned packets at the end of an activation.
    #[error("E401: Component '{component}' left {count} packet(s) undisposed at deactivation")]
    PacketsNotDisposed {
        /// The component name.
        component: String,
        /// Number of packets still owned.
        count: usize,
    },

    /// A component touched a packet it does not own.
    #[error("E402: Component '{component}' does not own {packet}")]
    PacketNotOwned {
        /// The component name.
        component: String,
        /// The packet.
        packet: PacketId,
    },

    /// Attaching would make a packet part of its own tree.
    #[error("E403: Attaching {subpacket} to {packet} would create a cycle")]
    CyclicChain {
        /// The target packet.
        packet: PacketId,
        /// The packet being attached.
        subpacket: PacketId,
    },

    /// A chain does not contain the requested member.
    #[error("E404: Chain '{chain}' of {packet} has no member {member}")]
    ChainMemberNotFound {
        /// The packet owning the chain.
        packet: PacketId,
        /// The chain name.
        chain: String,
        /// The missing member.
        member: PacketId,
    },

    /// A component terminated with packets left on its manual stack.
    #[error("E405: Component '{component}' terminated with {count} packet(s) on its stack")]
    StackNotEmpty {
        /// The component name.
        component: String,
        /// Number of packets left.
        count: usize,
    },

    // =========================================================================
    // Deadlock Errors (E501-E599)
    // =========================================================================
    /// Every unfinished runner is suspended and nothing can wake them.
    #[error("E501: Network '{network}' deadlocked: {}", format_blocked(.blocked))]
    Deadlock {
        /// The network name.
        network: String,
        /// What each suspended runner was waiting on.
        blocked: Vec<BlockedRunner>,
    },

    // =========================================================================
    // Serialization Errors (E801-E899)
    // =========================================================================
    /// JSON encoding or decoding failed.
    #[error("E801: Serialization failed: {cause}")]
    Serialization {
        /// Reason for the failure.
        cause: String,
    },
}

fn format_blocked(blocked: &[BlockedRunner]) -> String {
    blocked
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl RivuletError {
    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateComponent { .. } => "E101",
            Self::ComponentNotFound { .. } => "E102",
            Self::PortNotFound { .. } => "E103",
            Self::InvalidPortReference { .. } => "E104",
            Self::PortDirection { .. } => "E105",
            Self::MissingRequiredPort { .. } => "E106",
            Self::AlreadyInitialized { .. } => "E107",
            Self::AlreadyConnected { .. } => "E108",
            Self::CapacityMismatch { .. } => "E109",
            Self::PortIndexOutOfRange { .. } => "E110",
            Self::PortShape { .. } => "E111",
            Self::UnknownComponentType { .. } => "E112",
            Self::TypeValidation { .. } => "E113",
            Self::InvalidConfig { .. } => "E114",
            Self::Execution { .. } => "E301",
            Self::Terminated => "E302",
            Self::PacketsNotDisposed { .. } => "E401",
            Self::PacketNotOwned { .. } => "E402",
            Self::CyclicChain { .. } => "E403",
            Self::ChainMemberNotFound { .. } => "E404",
            Self::StackNotEmpty { .. } => "E405",
            Self::Deadlock { .. } => "E501",
            Self::Serialization { .. } => "E801",
        }
    }

    /// Check if this error is a configuration error detected while building.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateComponent { .. }
                | Self::ComponentNotFound { .. }
                | Self::PortNotFound { .. }
                | Self::InvalidPortReference { .. }
                | Self::PortDirection { .. }
                | Self::MissingRequiredPort { .. }
                | Self::AlreadyInitialized { .. }
                | Self::AlreadyConnected { .. }
                | Self::CapacityMismatch { .. }
                | Self::PortIndexOutOfRange { .. }
                | Self::PortShape { .. }
                | Self::UnknownComponentType { .. }
                | Self::TypeValidation { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Check if this error is a packet-discipline bug in a component.
    #[must_use]
    pub fn is_packet_error(&self) -> bool {
        matches!(
            self,
            Self::PacketsNotDisposed { .. }
                | Self::PacketNotOwned { .. }
                | Self::CyclicChain { .. }
                | Self::ChainMemberNotFound { .. }
                | Self::StackNotEmpty { .. }
        )
    }

    /// Check if this error was raised while the network was running.
    #[must_use]
    pub fn is_runtime_error(&self) -> bool {
        matches!(
            self,
            Self::Execution { .. } | Self::Terminated | Self::Deadlock { .. }
        )
    }
}

/// Result type alias using `RivuletError`.
pub type Result<T> = std::result::Result<T, RivuletError>;

/// Extension trait for adding component context to foreign errors.
pub trait ResultExt<T> {
    /// Wrap the error as an execution failure of the named component.
    fn with_component(self, component: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn with_component(self, component: &str) -> Result<T> {
        self.map_err(|e| RivuletError::Execution {
            component: component.to_string(),
            cause: e.to_string(),
        })
    }
}

impl From<serde_json::Error> for RivuletError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            cause: e.to_string(),
        }
    }
}
