//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Interface catalog aggregation and decoding using alloy-dyn-abi
//! - Remote signature databases and the persisted selector cache
//! - Declarative decoder plugins loaded from disk

pub mod abi;
pub mod plugin;

pub use abi::{AbiScanner, BuiltinSource, InterfaceCatalog, SelectorCache};
pub use plugin::DecoderDir;
