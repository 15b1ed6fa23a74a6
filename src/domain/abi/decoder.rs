//! ABI decoder trait and decoded-call types

use std::fmt;

use alloy_primitives::{Address, Bytes, B256, I256, U256};
use serde::Serialize;
use thiserror::Error;

use super::ParamSpec;

/// A dynamically typed decoded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Uint(U256),
    Int(I256),
    Bool(bool),
    Address(Address),
    /// Fixed-size byte word (`bytesN`, hashed indexed topics)
    FixedBytes(Bytes),
    /// Dynamic `bytes`
    Bytes(Bytes),
    String(String),
    List(Vec<ArgValue>),
    Record(Vec<RecordField>),
}

/// A named field of a record (tuple) value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordField {
    pub name: String,
    pub value: ArgValue,
}

impl ArgValue {
    /// Raw bytes of a dynamic `bytes` value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ArgValue::Bytes(bytes) => Some(bytes.as_ref()),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            ArgValue::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            ArgValue::Uint(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Uint(u) => {
                let s = u.to_string();
                // For very large numbers, show hex instead
                if s.len() > 20 {
                    write!(f, "0x{:x}", u)
                } else {
                    f.write_str(&s)
                }
            }
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Address(addr) => write!(f, "{}", addr),
            ArgValue::FixedBytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            ArgValue::Bytes(bytes) => {
                if bytes.len() <= 32 {
                    write!(f, "0x{}", hex::encode(bytes))
                } else {
                    write!(f, "0x{}… ({} bytes)", hex::encode(&bytes[..32]), bytes.len())
                }
            }
            ArgValue::String(s) => {
                if s.chars().count() <= 64 {
                    write!(f, "\"{}\"", s)
                } else {
                    let head: String = s.chars().take(64).collect();
                    write!(f, "\"{}…\" ({} chars)", head, s.chars().count())
                }
            }
            ArgValue::List(items) => {
                let max_items = 10;
                let shown: Vec<String> = items.iter().take(max_items).map(|v| v.to_string()).collect();
                if items.len() > max_items {
                    write!(f, "[{}, …] ({} items)", shown.join(", "), items.len())
                } else {
                    write!(f, "[{}]", shown.join(", "))
                }
            }
            ArgValue::Record(fields) => {
                let shown: Vec<String> = fields
                    .iter()
                    .map(|field| format!("{}: {}", field.name, field.value))
                    .collect();
                write!(f, "({})", shown.join(", "))
            }
        }
    }
}

/// A decoded function argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedArg {
    /// Parameter name (or "arg{n}" if unnamed)
    pub name: String,
    /// Solidity type (e.g., "address", "uint256", "(uint256,address)")
    #[serde(rename = "type")]
    pub kind: String,
    pub value: ArgValue,
}

impl DecodedArg {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, value: ArgValue) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            value,
        }
    }

    /// Opaque argument holding undecoded bytes
    pub fn opaque(data: &[u8]) -> Self {
        Self::new("data", "bytes", ArgValue::Bytes(Bytes::copy_from_slice(data)))
    }
}

/// Which resolution stage produced a decoded call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Resolution {
    /// Claimed and decoded by a decoder plugin
    Plugin { decoder: String },
    /// Structurally decoded against a catalog descriptor
    Catalog { signature: String },
    /// Named by a remote signature database; arguments left opaque
    SignatureLookup,
    /// Nothing matched
    Opaque,
    /// Nested discovery budget exhausted before this node was resolved
    Truncated,
}

/// Result of decoding a function call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedCall {
    /// 8 lowercase hex characters, no prefix
    pub selector: String,
    /// Resolved function name
    pub name: Option<String>,
    /// Unresolved text signature, set only when no structural decode succeeded
    pub signature: Option<String>,
    pub args: Vec<DecodedArg>,
    /// Calls discovered inside the arguments
    pub nested: Vec<DecodedCall>,
    pub resolution: Resolution,
}

impl DecodedCall {
    /// Selector with 0x prefix
    pub fn selector_hex(&self) -> String {
        format!("0x{}", self.selector)
    }

    /// Display label: name, then signature, then bare selector
    pub fn label(&self) -> String {
        match (&self.name, &self.signature) {
            (Some(name), _) => name.clone(),
            (None, Some(signature)) => signature.clone(),
            (None, None) => self.selector_hex(),
        }
    }

    /// Whether any stage assigned a name or signature
    pub fn is_resolved(&self) -> bool {
        matches!(
            self.resolution,
            Resolution::Plugin { .. } | Resolution::Catalog { .. } | Resolution::SignatureLookup
        )
    }

    pub fn arg(&self, name: &str) -> Option<&DecodedArg> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

/// Result of decoding an event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedLog {
    pub name: String,
    pub signature: String,
    pub topic: B256,
    pub args: Vec<DecodedArg>,
}

/// A structural decode failure for a single descriptor
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("failed to parse type '{kind}' for param '{name}': {reason}")]
    Type {
        name: String,
        kind: String,
        reason: String,
    },
    #[error("failed to decode parameters: {0}")]
    Decode(String),
    #[error("non-canonical encoding: {actual} bytes, canonical form is {canonical} bytes")]
    NonCanonical { actual: usize, canonical: usize },
    #[error("topic count mismatch: expected {expected}, got {actual}")]
    TopicCount { expected: usize, actual: usize },
}

/// Trait for ABI decoding implementations
///
/// This trait abstracts over the actual ABI decoding implementation,
/// allowing us to swap out alloy-dyn-abi for a different library if needed.
pub trait AbiDecoder: Send + Sync {
    /// Decode ABI-encoded parameters (no selector) positionally
    ///
    /// With `strict` set, the bytes must be exactly the canonical encoding
    /// of the decoded values.
    fn decode_params(
        &self,
        inputs: &[ParamSpec],
        data: &[u8],
        strict: bool,
    ) -> Result<Vec<DecodedArg>, StructuralError>;

    /// Decode an event log: indexed params from `topics[1..]`, the rest from `data`
    fn decode_log(
        &self,
        inputs: &[ParamSpec],
        topics: &[B256],
        data: &[u8],
    ) -> Result<Vec<DecodedArg>, StructuralError>;
}
