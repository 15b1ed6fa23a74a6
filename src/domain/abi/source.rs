//! Interface catalog sources

use std::collections::HashMap;

use super::{InterfaceDescriptor, InterfaceKind};

/// Descriptors and name maps contributed by a single source
#[derive(Debug, Clone, Default)]
pub struct CatalogFragment {
    pub descriptors: Vec<InterfaceDescriptor>,
    /// Event topic (0x-prefixed lowercase hex) -> display name
    pub event_names: HashMap<String, String>,
    /// Address (0x-prefixed lowercase hex) -> display name
    pub address_names: HashMap<String, String>,
}

impl CatalogFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fragment from a parsed JSON ABI
    ///
    /// `JsonAbi` orders items by name within each kind, so this does not
    /// keep declaration order.
    pub fn from_json_abi(abi: &alloy_json_abi::JsonAbi) -> Self {
        let mut fragment = Self::new();
        fragment
            .descriptors
            .extend(abi.functions().map(InterfaceDescriptor::from));
        fragment
            .descriptors
            .extend(abi.events().map(InterfaceDescriptor::from));
        fragment
            .descriptors
            .extend(abi.errors().map(InterfaceDescriptor::from));
        fragment
    }

    pub fn count(&self, kind: InterfaceKind) -> usize {
        self.descriptors.iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.event_names.is_empty() && self.address_names.is_empty()
    }
}

/// A supplier of interface descriptors
///
/// Sources are loaded once during catalog aggregation. A source that fails
/// to load is skipped.
pub trait CatalogSource: Send + Sync {
    /// Human-readable origin, used in warnings
    fn name(&self) -> String;

    fn load(&self) -> anyhow::Result<CatalogFragment>;
}

/// Normalize a hex key (address or topic) to 0x-prefixed lowercase
pub fn normalize_hex_key(key: &str) -> String {
    let trimmed = key.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", payload.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hex_key() {
        assert_eq!(normalize_hex_key("0XABCdef"), "0xabcdef");
        assert_eq!(normalize_hex_key(" abcd "), "0xabcd");
    }

    #[test]
    fn test_from_json_abi_counts() {
        let abi = alloy_json_abi::JsonAbi::parse([
            "function deposit()",
            "function withdraw(uint256 wad)",
            "event Deposit(address indexed dst, uint256 wad)",
            "error Unauthorized(address caller)",
        ])
        .unwrap();
        let fragment = CatalogFragment::from_json_abi(&abi);

        assert_eq!(fragment.count(InterfaceKind::Function), 2);
        assert_eq!(fragment.count(InterfaceKind::Event), 1);
        assert_eq!(fragment.count(InterfaceKind::Error), 1);
    }
}
