use std::collections::BTreeSet;

use bitvec::vec::BitVec;
use indexmap::IndexMap;
use jzon::JsonValue;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ParamValue {
    /// Printed MSB first, e.g. `16'b1111111111111110`.
    Bits(BitVec),
    String(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bits(bits) => {
                write!(f, "{}'b", bits.len())?;
                for bit in bits.iter().by_vals().rev() {
                    write!(f, "{}", if bit { '1' } else { '0' })?;
                }
                Ok(())
            }
            ParamValue::String(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Primitive {
    pub kind: String,
    pub name: String,
    /// port -> wire
    pub ports: IndexMap<String, String>,
    pub params: IndexMap<String, ParamValue>,
}

impl Primitive {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Primitive {
            kind: kind.into(),
            name: name.into(),
            ports: IndexMap::new(),
            params: IndexMap::new(),
        }
    }

    pub fn connect(&mut self, port: impl Into<String>, wire: impl Into<String>) {
        self.ports.insert(port.into(), wire.into());
    }
}

/// A flat module: wire declarations, primitive instances and `dest = src`
/// assignments.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Module {
    pub inputs: BTreeSet<String>,
    pub outputs: BTreeSet<String>,
    pub inouts: BTreeSet<String>,
    pub wires: BTreeSet<String>,
    /// dest -> src; a repeated dest keeps its position and takes the last src.
    pub assigns: IndexMap<String, String>,
    pub primitives: IndexMap<String, Primitive>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_primitive(&mut self, prim: Primitive) {
        self.primitives.insert(prim.name.clone(), prim);
    }

    pub fn assign(&mut self, dest: impl Into<String>, src: impl Into<String>) {
        let (dest, src) = (dest.into(), src.into());
        match self.assigns.insert(dest.clone(), src.clone()) {
            Some(prev) if prev != src => {
                log::warn!("{dest}: assignment from {prev} replaced by {src}")
            }
            _ => (),
        }
        self.wires.insert(dest);
        self.wires.insert(src);
    }

    pub fn is_port(&self, wire: &str) -> bool {
        self.inputs.contains(wire) || self.outputs.contains(wire) || self.inouts.contains(wire)
    }

    pub fn merge(&mut self, other: Module) {
        self.inputs.extend(other.inputs);
        self.outputs.extend(other.outputs);
        self.inouts.extend(other.inouts);
        self.wires.extend(other.wires);
        for (dest, src) in other.assigns {
            self.assign(dest, src);
        }
        self.primitives.extend(other.primitives);
    }

    /// Declared wires that are not module ports.
    pub fn internal_wires(&self) -> impl Iterator<Item = &str> {
        self.wires
            .iter()
            .map(String::as_str)
            .filter(|w| !self.is_port(w))
    }
}

impl From<&Primitive> for JsonValue {
    fn from(prim: &Primitive) -> Self {
        jzon::object! {
            kind: prim.kind.as_str(),
            name: prim.name.as_str(),
            ports: jzon::object::Object::from_iter(
                prim.ports.iter().map(|(port, wire)| (port.as_str(), wire.as_str()))
            ),
            params: jzon::object::Object::from_iter(
                prim.params.iter().map(|(name, val)| (name.as_str(), val.to_string()))
            ),
        }
    }
}

impl From<&Module> for JsonValue {
    fn from(module: &Module) -> Self {
        let names = |set: &BTreeSet<String>| -> JsonValue {
            Vec::from_iter(set.iter().map(|s| JsonValue::from(s.as_str()))).into()
        };
        jzon::object! {
            inputs: names(&module.inputs),
            outputs: names(&module.outputs),
            inouts: names(&module.inouts),
            wires: Vec::from_iter(module.internal_wires().map(JsonValue::from)),
            assigns: jzon::object::Object::from_iter(
                module.assigns.iter().map(|(dest, src)| (dest.as_str(), src.as_str()))
            ),
            primitives: Vec::from_iter(module.primitives.values().map(JsonValue::from)),
        }
    }
}
