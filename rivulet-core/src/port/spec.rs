//! Port declarations.

use crate::validator::TypeValidator;
use std::fmt;
use std::sync::Arc;

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Input port.
    Input,
    /// Output port.
    Output,
}

impl PortDirection {
    /// Get the lowercase name of the direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a port on a component type.
#[derive(Debug, Clone)]
pub struct PortSpec {
    /// Port name (e.g., "IN", "OUT", "CONF").
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Whether the port must be connected or initialized before a run.
    pub required: bool,
    /// Whether this is an array port.
    pub array: bool,
    /// Number of elements created eagerly for a fixed-size array port.
    pub fixed_size: Option<usize>,
    /// Validator applied to values passing through the port.
    pub validator: Option<Arc<dyn TypeValidator>>,
    /// Description of the port.
    pub description: String,
}

impl PortSpec {
    /// Create a required input port.
    pub fn input(name: impl Into<String>) -> Self {
        Self::named(name, PortDirection::Input)
    }

    /// Create an optional output port.
    pub fn output(name: impl Into<String>) -> Self {
        Self::named(name, PortDirection::Output)
    }

    /// Create a port with the default optionality for its direction.
    pub fn named(name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            required: direction == PortDirection::Input,
            array: false,
            fixed_size: None,
            validator: None,
            description: String::new(),
        }
    }

    /// Set the port as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the port as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Make this an array port whose elements are created on connect.
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Make this an array port with `size` eagerly created elements.
    pub fn fixed_size(mut self, size: usize) -> Self {
        self.array = true;
        self.fixed_size = Some(size);
        self
    }

    /// Attach a type validator.
    pub fn with_validator(mut self, validator: impl TypeValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Set the port description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Check if this is an input port.
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}
