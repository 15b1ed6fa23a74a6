//! ABI domain models and contracts
//!
//! This module defines the traits and types for ABI decoding,
//! independent of the underlying implementation (alloy-dyn-abi).

mod decoder;
mod descriptor;
mod source;

pub use decoder::{
    AbiDecoder, ArgValue, DecodedArg, DecodedCall, DecodedLog, RecordField, Resolution,
    StructuralError,
};
pub use descriptor::{InterfaceDescriptor, InterfaceKind, ParamSpec};
pub use source::{normalize_hex_key, CatalogFragment, CatalogSource};
