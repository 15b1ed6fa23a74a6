//! Shared context passed to decoders

use std::collections::BTreeMap;
use std::sync::Arc;

/// Context threaded through one top-level decode and all of its nested decodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeContext {
    /// User-defined labels for addresses (lowercase 0x address -> name)
    pub labels: Arc<BTreeMap<String, String>>,

    /// Selector of the payload currently being decoded (8 lowercase hex chars)
    pub selector: String,

    /// Contract the top-level payload was sent to
    pub address: Option<String>,

    pub chain_id: Option<u64>,
}

impl DecodeContext {
    pub fn new(labels: Arc<BTreeMap<String, String>>) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Same context, pointed at another payload's selector
    pub fn for_selector(&self, selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..self.clone()
        }
    }

    /// Get label for an address if it exists
    pub fn label_for(&self, address: &str) -> Option<&str> {
        self.labels.get(&address.to_lowercase()).map(|s| s.as_str())
    }
}
