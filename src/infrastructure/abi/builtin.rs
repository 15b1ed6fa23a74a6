//! Built-in interface set: token standards, WETH and batching entry points

use anyhow::{Context, Result};

use super::scanner::parse_catalog_document;
use crate::domain::abi::{CatalogFragment, CatalogSource};

const BUILTIN_CATALOG: &str = include_str!("builtin.json");

/// The catalog every aggregation starts from
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSource;

impl CatalogSource for BuiltinSource {
    fn name(&self) -> String {
        "builtin".to_string()
    }

    fn load(&self) -> Result<CatalogFragment> {
        let value: serde_json::Value =
            serde_json::from_str(BUILTIN_CATALOG).context("parse built-in catalog")?;
        parse_catalog_document(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abi::InterfaceKind;

    #[test]
    fn test_builtin_loads() {
        let fragment = BuiltinSource.load().unwrap();

        assert!(fragment.count(InterfaceKind::Function) >= 10);
        assert!(fragment.count(InterfaceKind::Event) >= 5);
        assert_eq!(fragment.count(InterfaceKind::Error), 2);

        let selectors: Vec<String> = fragment
            .descriptors
            .iter()
            .filter(|d| d.kind == InterfaceKind::Function)
            .map(|d| d.selector_hex())
            .collect();
        assert!(selectors.contains(&"0xa9059cbb".to_string()));
        assert!(selectors.contains(&"0x82ad56cb".to_string()));
        assert!(selectors.contains(&"0xac9650d8".to_string()));
    }
}
