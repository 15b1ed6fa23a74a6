//! txinspect: resolves raw EVM calldata, logs and revert data into readable call trees

pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod store;

pub use crate::core::{CalldataResolver, NestedLimits, ResolveError};
pub use crate::domain::abi::{ArgValue, DecodedArg, DecodedCall, DecodedLog, Resolution};
pub use crate::domain::decoder::{CalldataDecoder, DecodeContext, DecoderRegistry};
