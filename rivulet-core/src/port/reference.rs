//! Textual port references: `Comp.PORT` and `Comp.PORT[3]`.

use crate::error::{Result, RivuletError};
use std::fmt;
use std::str::FromStr;

/// A reference to a port of a named component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    /// Component name.
    pub component: String,
    /// Port name.
    pub port: String,
    /// Element index for array ports.
    pub index: Option<usize>,
}

impl PortRef {
    /// Create a reference to a scalar port.
    pub fn new(component: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
            index: None,
        }
    }

    /// Create a reference to an array port element.
    pub fn at(component: impl Into<String>, port: impl Into<String>, index: usize) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
            index: Some(index),
        }
    }

    /// Parse a reference.
    ///
    /// The component part may itself contain dots; the port is whatever
    /// follows the last one.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |cause: &str| RivuletError::InvalidPortReference {
            reference: reference.to_string(),
            cause: cause.to_string(),
        };

        let (component, port) = reference
            .trim()
            .rsplit_once('.')
            .ok_or_else(|| invalid("expected 'Component.PORT'"))?;
        if component.is_empty() {
            return Err(invalid("empty component name"));
        }

        let (port, index) = match port.split_once('[') {
            Some((name, rest)) => {
                let digits = rest
                    .strip_suffix(']')
                    .ok_or_else(|| invalid("unterminated index"))?;
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| invalid("index is not a non-negative integer"))?;
                (name, Some(index))
            }
            None => (port, None),
        };
        if port.is_empty() {
            return Err(invalid("empty port name"));
        }

        Ok(Self {
            component: component.to_string(),
            port: port.to_string(),
            index,
        })
    }
}

impl FromStr for PortRef {
    type Err = RivuletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Conversion into a [`PortRef`], parsing text where needed.
pub trait IntoPortRef {
    /// Convert into a port reference.
    fn into_port_ref(self) -> Result<PortRef>;
}

impl IntoPortRef for PortRef {
    fn into_port_ref(self) -> Result<PortRef> {
        Ok(self)
    }
}

impl IntoPortRef for &PortRef {
    fn into_port_ref(self) -> Result<PortRef> {
        Ok(self.clone())
    }
}

impl IntoPortRef for &str {
    fn into_port_ref(self) -> Result<PortRef> {
        PortRef::parse(self)
    }
}

impl IntoPortRef for String {
    fn into_port_ref(self) -> Result<PortRef> {
        PortRef::parse(&self)
    }
}

impl IntoPortRef for &String {
    fn into_port_ref(self) -> Result<PortRef> {
        PortRef::parse(self)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}.{}[{}]", self.component, self.port, index),
            None => write!(f, "{}.{}", self.component, self.port),
        }
    }
}
