//! Interface descriptors - the typed shape of functions, events and errors

use alloy_json_abi::{Error, Event, EventParam, Function, Param};
use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

/// What an interface descriptor describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Function,
    Event,
    Error,
}

/// A parameter specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name (may be empty)
    pub name: String,
    /// Solidity type (e.g., "address", "uint256", "(uint256,address)[]")
    #[serde(alias = "type")]
    pub kind: String,
    /// Whether the parameter is an indexed event topic
    #[serde(default)]
    pub indexed: bool,
    /// Tuple component specs, used to name record fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ParamSpec>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            indexed: false,
            components: Vec::new(),
        }
    }

    /// Display name, falling back to "arg{idx}" for unnamed parameters
    pub fn display_name(&self, idx: usize) -> String {
        if self.name.trim().is_empty() {
            format!("arg{}", idx)
        } else {
            self.name.clone()
        }
    }
}

impl From<&Param> for ParamSpec {
    fn from(param: &Param) -> Self {
        Self {
            name: param.name.clone(),
            kind: param.selector_type().into_owned(),
            indexed: false,
            components: param.components.iter().map(ParamSpec::from).collect(),
        }
    }
}

impl From<&EventParam> for ParamSpec {
    fn from(param: &EventParam) -> Self {
        Self {
            name: param.name.clone(),
            kind: param.selector_type().into_owned(),
            indexed: param.indexed,
            components: param.components.iter().map(ParamSpec::from).collect(),
        }
    }
}

/// A function, event or error with its ordered, typed parameters.
///
/// Immutable once loaded; the catalog owns every descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub kind: InterfaceKind,
    pub name: String,
    /// Canonical signature (e.g., "transfer(address,uint256)")
    pub signature: String,
    /// Keccak-256 of the signature; events use all 32 bytes as topic0
    pub hash: B256,
    pub inputs: Vec<ParamSpec>,
}

impl InterfaceDescriptor {
    /// Build a descriptor from a name and parameter list, deriving signature and hash
    pub fn new(kind: InterfaceKind, name: impl Into<String>, inputs: Vec<ParamSpec>) -> Self {
        let name = name.into();
        let types: Vec<&str> = inputs.iter().map(|p| p.kind.as_str()).collect();
        let signature = format!("{}({})", name, types.join(","));
        let hash = keccak256(signature.as_bytes());
        Self {
            kind,
            name,
            signature,
            hash,
            inputs,
        }
    }

    /// 4-byte selector (first 4 bytes of the signature hash)
    pub fn selector(&self) -> [u8; 4] {
        [self.hash[0], self.hash[1], self.hash[2], self.hash[3]]
    }

    /// Selector as hex string with 0x prefix
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector()))
    }

    /// Event topic0
    pub fn topic(&self) -> B256 {
        self.hash
    }

    pub fn indexed_count(&self) -> usize {
        self.inputs.iter().filter(|p| p.indexed).count()
    }
}

impl From<&Function> for InterfaceDescriptor {
    fn from(function: &Function) -> Self {
        Self::new(
            InterfaceKind::Function,
            function.name.clone(),
            function.inputs.iter().map(ParamSpec::from).collect(),
        )
    }
}

impl From<&Event> for InterfaceDescriptor {
    fn from(event: &Event) -> Self {
        Self::new(
            InterfaceKind::Event,
            event.name.clone(),
            event.inputs.iter().map(ParamSpec::from).collect(),
        )
    }
}

impl From<&Error> for InterfaceDescriptor {
    fn from(error: &Error) -> Self {
        Self::new(
            InterfaceKind::Error,
            error.name.clone(),
            error.inputs.iter().map(ParamSpec::from).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_and_selector() {
        let transfer = InterfaceDescriptor::new(
            InterfaceKind::Function,
            "transfer",
            vec![ParamSpec::new("to", "address"), ParamSpec::new("amount", "uint256")],
        );

        assert_eq!(transfer.signature, "transfer(address,uint256)");
        assert_eq!(transfer.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(transfer.selector_hex(), "0xa9059cbb");
    }

    #[test]
    fn test_from_json_abi_tuple_components() {
        let abi: alloy_json_abi::JsonAbi = serde_json::from_str(
            r#"[{"type":"function","name":"aggregate","stateMutability":"payable","outputs":[],
                "inputs":[{"name":"calls","type":"tuple[]","components":[
                    {"name":"target","type":"address"},{"name":"callData","type":"bytes"}]}]}]"#,
        )
        .unwrap();
        let function = abi.functions().next().unwrap();
        let descriptor = InterfaceDescriptor::from(function);

        assert_eq!(descriptor.signature, "aggregate((address,bytes)[])");
        assert_eq!(descriptor.selector_hex(), "0x252dba42");
        assert_eq!(descriptor.inputs[0].components.len(), 2);
        assert_eq!(descriptor.inputs[0].components[1].name, "callData");
    }

    #[test]
    fn test_event_indexed_count() {
        let event = Event::parse(
            "event Transfer(address indexed from, address indexed to, uint256 value)",
        )
        .unwrap();
        let descriptor = InterfaceDescriptor::from(&event);

        assert_eq!(descriptor.kind, InterfaceKind::Event);
        assert_eq!(descriptor.indexed_count(), 2);
        assert_eq!(
            hex::encode(descriptor.topic()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_unnamed_display_name() {
        let param = ParamSpec::new("", "uint256");
        assert_eq!(param.display_name(2), "arg2");
    }
}
