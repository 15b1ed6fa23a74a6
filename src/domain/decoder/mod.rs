//! Decoder plugin contracts
//!
//! Plugins claim calldata ahead of the interface catalog. Each plugin type
//! implements [`CalldataDecoder`] and is handed to the [`DecoderRegistry`]
//! explicitly; there is no shape-probing at load time.

mod context;
mod registry;

pub use context::DecodeContext;
pub use registry::{DecoderRegistry, DecoderSource};

use thiserror::Error;

use crate::domain::abi::{DecodedArg, DecodedCall};

/// Structured output of a plugin decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCall {
    pub name: String,
    pub params: Vec<DecodedArg>,
    /// Nested calls the plugin discovered itself; nested detection is not
    /// run over plugin output.
    pub nested: Vec<DecodedCall>,
}

impl PluginCall {
    pub fn new(name: impl Into<String>, params: Vec<DecodedArg>) -> Self {
        Self {
            name: name.into(),
            params,
            nested: Vec::new(),
        }
    }
}

/// Failure reported by a plugin's decode
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Structural(#[from] crate::domain::abi::StructuralError),
}

/// A decoder plugin
pub trait CalldataDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// Higher resolves first
    fn priority(&self) -> i32 {
        0
    }

    fn matches(&self, data: &[u8], ctx: &DecodeContext) -> bool;

    /// `Ok(None)` means the plugin claimed the payload but has nothing to say
    fn decode(&self, data: &[u8], ctx: &DecodeContext) -> Result<Option<PluginCall>, PluginError>;
}
