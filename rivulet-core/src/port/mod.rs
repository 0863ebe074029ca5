//! Ports: declarations, runtime endpoints and per-component port sets.
//!
//! A component's runtime port is either a scalar port or a sparse array of
//! scalar element ports ([`PortSlot`]). Fixed-size arrays create all their
//! elements up front; other arrays create an element on first connect.

mod handle;
mod input;
mod output;
mod reference;
mod spec;

pub use handle::{InputHandle, OutputHandle};
pub use input::InputPort;
pub use output::OutputPort;
pub use reference::{IntoPortRef, PortRef};
pub use spec::{PortDirection, PortSpec};

use crate::error::{Result, RivuletError};
use std::collections::BTreeMap;

/// A runtime port that can be created from its declaration.
pub trait PortElement {
    /// Create an unconnected port with the given full name.
    fn create(name: String, spec: &PortSpec) -> Self;
}

impl PortElement for InputPort {
    fn create(name: String, _spec: &PortSpec) -> Self {
        InputPort::new(name)
    }
}

impl PortElement for OutputPort {
    fn create(name: String, spec: &PortSpec) -> Self {
        OutputPort::new(name, spec.validator.clone())
    }
}

/// Sparse, 0-indexed collection of element ports.
#[derive(Debug)]
pub struct ArrayPort<P> {
    fixed_size: Option<usize>,
    elements: BTreeMap<usize, P>,
}

impl<P> ArrayPort<P> {
    /// Get an element.
    pub fn get(&self, index: usize) -> Option<&P> {
        self.elements.get(&index)
    }

    /// Iterate over existing elements in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &P)> {
        self.elements.iter().map(|(i, p)| (*i, p))
    }

    /// Indices of existing elements.
    pub fn indices(&self) -> Vec<usize> {
        self.elements.keys().copied().collect()
    }

    /// Number of existing elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if no element exists.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get the declared fixed size.
    pub fn fixed_size(&self) -> Option<usize> {
        self.fixed_size
    }
}

/// A runtime port: scalar or array.
#[derive(Debug)]
pub enum PortSlot<P> {
    /// A single port.
    Scalar(P),
    /// An array of element ports.
    Array(ArrayPort<P>),
}

impl<P> PortSlot<P> {
    /// Iterate over the scalar port or every array element.
    pub fn ports(&self) -> Box<dyn Iterator<Item = &P> + '_> {
        match self {
            Self::Scalar(port) => Box::new(std::iter::once(port)),
            Self::Array(array) => Box::new(array.elements.values()),
        }
    }
}

/// A declared port together with its runtime slot.
#[derive(Debug)]
pub struct PortEntry<P> {
    /// The declaration.
    pub spec: PortSpec,
    /// The runtime port(s).
    pub slot: PortSlot<P>,
}

impl<P: PortElement> PortEntry<P> {
    fn new(component: &str, spec: PortSpec) -> Self {
        let slot = if spec.array {
            let elements = (0..spec.fixed_size.unwrap_or(0))
                .map(|i| (i, P::create(element_name(component, &spec.name, i), &spec)))
                .collect();
            PortSlot::Array(ArrayPort {
                fixed_size: spec.fixed_size,
                elements,
            })
        } else {
            PortSlot::Scalar(P::create(format!("{}.{}", component, spec.name), &spec))
        };
        Self { spec, slot }
    }
}

fn element_name(component: &str, port: &str, index: usize) -> String {
    format!("{}.{}[{}]", component, port, index)
}

/// All ports of one component.
#[derive(Debug)]
pub struct Ports {
    component: String,
    inputs: Vec<PortEntry<InputPort>>,
    outputs: Vec<PortEntry<OutputPort>>,
}

impl Ports {
    /// Create the runtime ports of `component` from its declarations.
    pub fn new(component: &str, specs: &[PortSpec]) -> Self {
        let mut ports = Self {
            component: component.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        for spec in specs {
            match spec.direction {
                PortDirection::Input => ports.inputs.push(PortEntry::new(component, spec.clone())),
                PortDirection::Output => {
                    ports.outputs.push(PortEntry::new(component, spec.clone()))
                }
            }
        }
        ports
    }

    /// Get the component name.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Declared input ports.
    pub fn input_entries(&self) -> &[PortEntry<InputPort>] {
        &self.inputs
    }

    /// Declared output ports.
    pub fn output_entries(&self) -> &[PortEntry<OutputPort>] {
        &self.outputs
    }

    /// Iterate over every runtime input port, array elements included.
    pub fn all_inputs(&self) -> impl Iterator<Item = &InputPort> {
        self.inputs.iter().flat_map(|entry| entry.slot.ports())
    }

    /// Iterate over every runtime output port, array elements included.
    pub fn all_outputs(&self) -> impl Iterator<Item = &OutputPort> {
        self.outputs.iter().flat_map(|entry| entry.slot.ports())
    }

    /// Get the declaration of a port in either direction.
    pub fn spec(&self, name: &str) -> Option<&PortSpec> {
        self.inputs
            .iter()
            .map(|e| &e.spec)
            .chain(self.outputs.iter().map(|e| &e.spec))
            .find(|spec| spec.name == name)
    }

    /// Get a scalar input port.
    pub fn input(&self, name: &str) -> Result<&InputPort> {
        self.scalar(self.find_input(name)?)
    }

    /// Get an element of an array input port.
    pub fn input_at(&self, name: &str, index: usize) -> Result<&InputPort> {
        self.element(self.find_input(name)?, index)
    }

    /// Get an array input port.
    pub fn input_array(&self, name: &str) -> Result<&ArrayPort<InputPort>> {
        self.array(self.find_input(name)?)
    }

    /// Get a scalar output port.
    pub fn output(&self, name: &str) -> Result<&OutputPort> {
        self.scalar(self.find_output(name)?)
    }

    /// Get an element of an array output port.
    pub fn output_at(&self, name: &str, index: usize) -> Result<&OutputPort> {
        self.element(self.find_output(name)?, index)
    }

    /// Get an array output port.
    pub fn output_array(&self, name: &str) -> Result<&ArrayPort<OutputPort>> {
        self.array(self.find_output(name)?)
    }

    /// Get an input port for wiring, creating array elements on demand.
    pub fn input_mut(&mut self, name: &str, index: Option<usize>) -> Result<&mut InputPort> {
        let component = self.component.clone();
        let pos = self.position(name, PortDirection::Input)?;
        slot_mut(&component, &mut self.inputs[pos], index)
    }

    /// Get an output port for wiring, creating array elements on demand.
    pub fn output_mut(&mut self, name: &str, index: Option<usize>) -> Result<&mut OutputPort> {
        let component = self.component.clone();
        let pos = self.position(name, PortDirection::Output)?;
        slot_mut(&component, &mut self.outputs[pos], index)
    }

    /// Check that every required port is connected or initialized.
    ///
    /// A required array port needs at least one connected element.
    pub fn validate_required(&self) -> Result<()> {
        for entry in self.inputs.iter().filter(|e| e.spec.required) {
            if !entry.slot.ports().any(InputPort::is_connected) {
                return Err(self.missing(&entry.spec.name));
            }
        }
        for entry in self.outputs.iter().filter(|e| e.spec.required) {
            if !entry.slot.ports().any(OutputPort::is_connected) {
                return Err(self.missing(&entry.spec.name));
            }
        }
        Ok(())
    }

    fn missing(&self, port: &str) -> RivuletError {
        RivuletError::MissingRequiredPort {
            component: self.component.clone(),
            port: port.to_string(),
        }
    }

    fn position(&self, name: &str, direction: PortDirection) -> Result<usize> {
        let (wanted, other) = match direction {
            PortDirection::Input => (
                self.inputs.iter().position(|e| e.spec.name == name),
                self.outputs.iter().any(|e| e.spec.name == name),
            ),
            PortDirection::Output => (
                self.outputs.iter().position(|e| e.spec.name == name),
                self.inputs.iter().any(|e| e.spec.name == name),
            ),
        };
        match wanted {
            Some(pos) => Ok(pos),
            None if other => Err(RivuletError::PortDirection {
                component: self.component.clone(),
                port: name.to_string(),
                expected: direction.as_str(),
            }),
            None => Err(RivuletError::PortNotFound {
                component: self.component.clone(),
                port: name.to_string(),
            }),
        }
    }

    fn find_input(&self, name: &str) -> Result<&PortEntry<InputPort>> {
        Ok(&self.inputs[self.position(name, PortDirection::Input)?])
    }

    fn find_output(&self, name: &str) -> Result<&PortEntry<OutputPort>> {
        Ok(&self.outputs[self.position(name, PortDirection::Output)?])
    }

    fn scalar<'p, P>(&self, entry: &'p PortEntry<P>) -> Result<&'p P> {
        match &entry.slot {
            PortSlot::Scalar(port) => Ok(port),
            PortSlot::Array(_) => {
                Err(shape_error(&self.component, &entry.spec, "is an array port"))
            }
        }
    }

    fn array<'p, P>(&self, entry: &'p PortEntry<P>) -> Result<&'p ArrayPort<P>> {
        match &entry.slot {
            PortSlot::Array(array) => Ok(array),
            PortSlot::Scalar(_) => {
                Err(shape_error(&self.component, &entry.spec, "is not an array port"))
            }
        }
    }

    fn element<'p, P>(&self, entry: &'p PortEntry<P>, index: usize) -> Result<&'p P> {
        let array = self.array(entry)?;
        check_range(&self.component, &entry.spec, index)?;
        array.get(index).ok_or_else(|| RivuletError::PortNotFound {
            component: self.component.clone(),
            port: format!("{}[{}]", entry.spec.name, index),
        })
    }
}

fn shape_error(component: &str, spec: &PortSpec, cause: &str) -> RivuletError {
    RivuletError::PortShape {
        component: component.to_string(),
        port: spec.name.clone(),
        cause: cause.to_string(),
    }
}

fn check_range(component: &str, spec: &PortSpec, index: usize) -> Result<()> {
    match spec.fixed_size {
        Some(size) if index >= size => Err(RivuletError::PortIndexOutOfRange {
            component: component.to_string(),
            port: spec.name.clone(),
            index,
            size,
        }),
        _ => Ok(()),
    }
}

fn slot_mut<'p, P: PortElement>(
    component: &str,
    entry: &'p mut PortEntry<P>,
    index: Option<usize>,
) -> Result<&'p mut P> {
    match (&mut entry.slot, index) {
        (PortSlot::Scalar(port), None) => Ok(port),
        (PortSlot::Array(array), Some(index)) => {
            check_range(component, &entry.spec, index)?;
            let spec = &entry.spec;
            Ok(array
                .elements
                .entry(index)
                .or_insert_with(|| P::create(element_name(component, &spec.name, index), spec)))
        }
        (PortSlot::Scalar(_), Some(_)) => {
            Err(shape_error(component, &entry.spec, "is not an array port"))
        }
        (PortSlot::Array(_), None) => Err(shape_error(
            component,
            &entry.spec,
            "is an array port and needs an index",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<PortSpec> {
        vec![
            PortSpec::input("IN"),
            PortSpec::input("CONF").optional(),
            PortSpec::input("ITEMS").array().optional(),
            PortSpec::output("OUT"),
            PortSpec::output("LANES").fixed_size(2),
        ]
    }

    #[test]
    fn lookup_by_direction_and_shape() {
        let ports = Ports::new("Comp", &specs());
        assert_eq!(ports.input("IN").unwrap().name(), "Comp.IN");
        assert_eq!(ports.output_at("LANES", 1).unwrap().name(), "Comp.LANES[1]");
        assert_eq!(ports.output_array("LANES").unwrap().len(), 2);

        assert_eq!(ports.input("OUT").unwrap_err().code(), "E105");
        assert_eq!(ports.input("NOPE").unwrap_err().code(), "E103");
        assert_eq!(ports.input("ITEMS").unwrap_err().code(), "E111");
        assert_eq!(ports.output_at("LANES", 2).unwrap_err().code(), "E110");
        assert_eq!(ports.input_at("ITEMS", 0).unwrap_err().code(), "E103");
    }

    #[test]
    fn array_elements_created_on_demand() {
        let mut ports = Ports::new("Comp", &specs());
        assert!(ports.input_array("ITEMS").unwrap().is_empty());
        let port = ports.input_mut("ITEMS", Some(3)).unwrap();
        assert_eq!(port.name(), "Comp.ITEMS[3]");
        assert_eq!(ports.input_array("ITEMS").unwrap().indices(), vec![3]);

        assert_eq!(ports.input_mut("ITEMS", None).unwrap_err().code(), "E111");
        assert_eq!(ports.input_mut("IN", Some(0)).unwrap_err().code(), "E111");
    }

    #[test]
    fn required_ports_must_be_connected() {
        let ports = Ports::new("Comp", &specs());
        let err = ports.validate_required().unwrap_err();
        assert_eq!(err.code(), "E106");
        assert!(err.to_string().contains("Comp.IN"));
    }
}
