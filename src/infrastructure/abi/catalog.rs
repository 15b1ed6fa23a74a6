//! Interface catalog - aggregated descriptors and name maps

use std::collections::HashMap;

use alloy_primitives::B256;
use tracing::{debug, info, warn};

use super::decoder::AlloyAbiDecoder;
use crate::domain::abi::{
    normalize_hex_key, AbiDecoder, CatalogFragment, CatalogSource, DecodedArg, DecodedCall,
    DecodedLog, InterfaceDescriptor, InterfaceKind, Resolution,
};

/// Merged view over every catalog source
///
/// Built once at startup and read-only afterwards; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct InterfaceCatalog {
    functions: Vec<InterfaceDescriptor>,
    events: Vec<InterfaceDescriptor>,
    errors: Vec<InterfaceDescriptor>,
    event_names: HashMap<String, String>,
    address_names: HashMap<String, String>,
    structural_fallback: bool,
    decoder: AlloyAbiDecoder,
}

impl Default for InterfaceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            events: Vec::new(),
            errors: Vec::new(),
            event_names: HashMap::new(),
            address_names: HashMap::new(),
            structural_fallback: true,
            decoder: AlloyAbiDecoder::new(),
        }
    }

    /// Aggregate sources in order; a failing source is logged and skipped
    pub fn aggregate(sources: &[Box<dyn CatalogSource>]) -> Self {
        let mut catalog = Self::new();
        let mut loaded = 0usize;
        for source in sources {
            match source.load() {
                Ok(fragment) => {
                    debug!(
                        source = %source.name(),
                        descriptors = fragment.descriptors.len(),
                        "loaded catalog source"
                    );
                    catalog.extend(fragment);
                    loaded += 1;
                }
                Err(err) => {
                    warn!(source = %source.name(), error = %err, "skipping malformed catalog source");
                }
            }
        }
        info!(
            sources = loaded,
            functions = catalog.functions.len(),
            events = catalog.events.len(),
            errors = catalog.errors.len(),
            "interface catalog aggregated"
        );
        catalog
    }

    /// Enable or disable the structural (selector-agnostic) fallback scan
    pub fn with_structural_fallback(mut self, enabled: bool) -> Self {
        self.structural_fallback = enabled;
        self
    }

    /// Append a fragment; name maps are last-source-wins
    pub fn extend(&mut self, fragment: CatalogFragment) {
        for descriptor in fragment.descriptors {
            match descriptor.kind {
                InterfaceKind::Function => self.functions.push(descriptor),
                InterfaceKind::Event => self.events.push(descriptor),
                InterfaceKind::Error => self.errors.push(descriptor),
            }
        }
        self.event_names.extend(fragment.event_names);
        self.address_names.extend(fragment.address_names);
    }

    pub fn functions(&self) -> &[InterfaceDescriptor] {
        &self.functions
    }

    pub fn events(&self) -> &[InterfaceDescriptor] {
        &self.events
    }

    pub fn errors(&self) -> &[InterfaceDescriptor] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.events.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve calldata against function descriptors
    ///
    /// Descriptors whose selector matches the payload are tried first, in
    /// catalog order. If none decodes and the structural fallback is on, every
    /// other descriptor with at least one parameter is tried in catalog order
    /// and the first one whose canonical encoding reproduces the body wins.
    pub fn resolve_by_catalog(&self, data: &[u8]) -> Option<DecodedCall> {
        if data.len() < 4 {
            return None;
        }
        let (selector, body) = data.split_at(4);

        let by_selector = self
            .functions
            .iter()
            .filter(|d| d.selector() == selector)
            .find_map(|d| self.try_decode(d, body, false));
        if by_selector.is_some() {
            return by_selector;
        }

        if !self.structural_fallback {
            return None;
        }

        self.functions
            .iter()
            .filter(|d| d.selector() != selector && !d.inputs.is_empty())
            .find_map(|d| self.try_decode(d, body, true))
            .map(|mut call| {
                // Report the payload's own selector, not the descriptor's
                call.selector = hex::encode(selector);
                call
            })
    }

    /// Resolve revert data against error descriptors (selector must match)
    pub fn resolve_error(&self, data: &[u8]) -> Option<DecodedCall> {
        if data.len() < 4 {
            return None;
        }
        let (selector, body) = data.split_at(4);
        self.errors
            .iter()
            .filter(|d| d.selector() == selector)
            .find_map(|d| self.try_decode(d, body, false))
    }

    /// Resolve an event log by topic0 and indexed parameter count
    pub fn resolve_log(&self, topics: &[B256], data: &[u8]) -> Option<DecodedLog> {
        let topic0 = topics.first()?;
        self.events
            .iter()
            .filter(|d| d.topic() == *topic0 && d.indexed_count() + 1 == topics.len())
            .find_map(|d| match self.decoder.decode_log(&d.inputs, topics, data) {
                Ok(args) => Some(DecodedLog {
                    name: self.event_name(topic0).unwrap_or_else(|| d.name.clone()),
                    signature: d.signature.clone(),
                    topic: *topic0,
                    args,
                }),
                Err(err) => {
                    debug!(event = %d.signature, error = %err, "event candidate rejected");
                    None
                }
            })
    }

    /// Display name for an event topic: explicit name map first, then descriptors
    pub fn event_name(&self, topic: &B256) -> Option<String> {
        let key = format!("0x{}", hex::encode(topic));
        if let Some(name) = self.event_names.get(&key) {
            return Some(name.clone());
        }
        self.events
            .iter()
            .find(|d| d.topic() == *topic)
            .map(|d| d.name.clone())
    }

    /// Display name for a contract address (case-insensitive)
    pub fn address_name(&self, address: &str) -> Option<&str> {
        self.address_names
            .get(&normalize_hex_key(address))
            .map(String::as_str)
    }

    fn try_decode(&self, descriptor: &InterfaceDescriptor, body: &[u8], strict: bool) -> Option<DecodedCall> {
        match self.decoder.decode_params(&descriptor.inputs, body, strict) {
            Ok(args) => Some(Self::to_call(descriptor, args)),
            Err(err) => {
                debug!(candidate = %descriptor.signature, error = %err, "catalog candidate rejected");
                None
            }
        }
    }

    fn to_call(descriptor: &InterfaceDescriptor, args: Vec<DecodedArg>) -> DecodedCall {
        DecodedCall {
            selector: hex::encode(descriptor.selector()),
            name: Some(descriptor.name.clone()),
            signature: None,
            args,
            nested: Vec::new(),
            resolution: Resolution::Catalog {
                signature: descriptor.signature.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abi::ParamSpec;
    use crate::infrastructure::abi::{parse_catalog_document, BuiltinSource};
    use alloy_dyn_abi::DynSolValue;
    use alloy_primitives::{Address, U256};

    struct Fixed(CatalogFragment);

    impl CatalogSource for Fixed {
        fn name(&self) -> String {
            "fixed".into()
        }

        fn load(&self) -> anyhow::Result<CatalogFragment> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl CatalogSource for Broken {
        fn name(&self) -> String {
            "broken".into()
        }

        fn load(&self) -> anyhow::Result<CatalogFragment> {
            anyhow::bail!("not an ABI")
        }
    }

    fn function(name: &str, inputs: Vec<ParamSpec>) -> InterfaceDescriptor {
        InterfaceDescriptor::new(InterfaceKind::Function, name, inputs)
    }

    fn builtin() -> InterfaceCatalog {
        InterfaceCatalog::aggregate(&[Box::new(BuiltinSource)])
    }

    fn transfer_calldata() -> Vec<u8> {
        let mut data = hex::decode("a9059cbb").unwrap();
        data.extend(
            DynSolValue::Tuple(vec![
                DynSolValue::Address(Address::repeat_byte(0x42)),
                DynSolValue::Uint(U256::from(1_000_000u64), 256),
            ])
            .abi_encode_params(),
        );
        data
    }

    #[test]
    fn test_resolve_transfer_by_selector() {
        let call = builtin().resolve_by_catalog(&transfer_calldata()).unwrap();

        assert_eq!(call.name.as_deref(), Some("transfer"));
        assert_eq!(call.selector, "a9059cbb");
        assert!(call.signature.is_none());
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0].kind, "address");
        assert_eq!(call.args[1].kind, "uint256");
    }

    #[test]
    fn test_malformed_source_skipped() {
        let mut fragment = CatalogFragment::new();
        fragment.descriptors.push(function("ping", vec![]));
        let catalog = InterfaceCatalog::aggregate(&[Box::new(Broken), Box::new(Fixed(fragment))]);

        assert_eq!(catalog.functions().len(), 1);
    }

    #[test]
    fn test_structural_fallback_first_valid_wins() {
        let mut fragment = CatalogFragment::new();
        fragment
            .descriptors
            .push(function("first", vec![ParamSpec::new("a", "bytes")]));
        fragment
            .descriptors
            .push(function("second", vec![ParamSpec::new("a", "uint256")]));
        fragment
            .descriptors
            .push(function("third", vec![ParamSpec::new("b", "uint256")]));
        let catalog = InterfaceCatalog::aggregate(&[Box::new(Fixed(fragment))]);

        let mut data = vec![0xde, 0xad, 0xbe, 0xef];
        data.extend(U256::from(5).to_be_bytes::<32>());

        let call = catalog.resolve_by_catalog(&data).unwrap();
        assert_eq!(call.name.as_deref(), Some("second"));
        assert_eq!(call.selector, "deadbeef");

        let strict = catalog.with_structural_fallback(false);
        assert!(strict.resolve_by_catalog(&data).is_none());
    }

    #[test]
    fn test_fallback_follows_declaration_order() {
        let document = serde_json::json!([
            {"type": "function", "name": "zeta", "inputs": [{"name": "a", "type": "uint256"}], "outputs": [], "stateMutability": "nonpayable"},
            {"type": "function", "name": "alpha", "inputs": [{"name": "b", "type": "uint256"}], "outputs": [], "stateMutability": "nonpayable"}
        ]);
        let fragment = parse_catalog_document(&document).unwrap();
        let catalog = InterfaceCatalog::aggregate(&[Box::new(Fixed(fragment))]);

        let names: Vec<&str> = catalog.functions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);

        let mut data = vec![0xde, 0xad, 0xbe, 0xef];
        data.extend(U256::from(5).to_be_bytes::<32>());
        let call = catalog.resolve_by_catalog(&data).unwrap();
        assert_eq!(call.name.as_deref(), Some("zeta"));
        assert_eq!(call.args[0].name, "a");
    }

    #[test]
    fn test_builtin_keeps_declaration_order() {
        let catalog = builtin();
        let names: Vec<&str> = catalog.functions().iter().take(3).map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["transfer", "approve", "transferFrom"]);
    }

    #[test]
    fn test_fallback_ignores_zero_param_descriptors() {
        let data = hex::decode("12345678").unwrap();
        assert!(builtin().resolve_by_catalog(&data).is_none());
    }

    #[test]
    fn test_no_match_returns_none() {
        let data = hex::decode("deadbeef01").unwrap();
        assert!(builtin().resolve_by_catalog(&data).is_none());
    }

    #[test]
    fn test_resolve_error_string() {
        let mut data = hex::decode("08c379a0").unwrap();
        data.extend(DynSolValue::Tuple(vec![DynSolValue::String("nope".into())]).abi_encode_params());

        let call = builtin().resolve_error(&data).unwrap();
        assert_eq!(call.name.as_deref(), Some("Error"));
        assert_eq!(call.args[0].value.to_string(), "\"nope\"");
    }

    #[test]
    fn test_resolve_log_erc20_vs_erc721() {
        let catalog = builtin();
        let topic0: B256 = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
            .parse()
            .unwrap();
        let from = Address::repeat_byte(0x01).into_word();
        let to = Address::repeat_byte(0x02).into_word();

        let erc20 = catalog
            .resolve_log(&[topic0, from, to], &U256::from(9).to_be_bytes::<32>())
            .unwrap();
        assert_eq!(erc20.name, "Transfer");
        assert_eq!(erc20.args[2].name, "value");

        let token_id = B256::from(U256::from(7).to_be_bytes::<32>());
        let erc721 = catalog.resolve_log(&[topic0, from, to, token_id], &[]).unwrap();
        assert_eq!(erc721.args[2].name, "tokenId");
        assert_eq!(erc721.args[2].value.as_uint(), Some(U256::from(7)));
    }

    #[test]
    fn test_name_maps_last_source_wins() {
        let mut first = CatalogFragment::new();
        first.address_names.insert("0xabc".into(), "Old".into());
        let mut second = CatalogFragment::new();
        second.address_names.insert("0xabc".into(), "New".into());

        let catalog = InterfaceCatalog::aggregate(&[Box::new(Fixed(first)), Box::new(Fixed(second))]);
        assert_eq!(catalog.address_name("0xABC"), Some("New"));
        assert_eq!(
            builtin().address_name("0xcA11bde05977b3631167028862bE2a173976CA11"),
            Some("Multicall3")
        );
    }
}
