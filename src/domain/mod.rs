//! Domain layer - models and contracts independent of alloy plumbing
//!
//! - `abi`: interface descriptors, decoded calls and the decoder trait
//! - `decoder`: decoder plugin trait, decode context and plugin registry

pub mod abi;
pub mod decoder;
