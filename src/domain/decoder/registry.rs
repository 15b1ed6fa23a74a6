//! Decoder registry - holds plugins ordered by priority

use std::cmp::Reverse;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::{CalldataDecoder, DecodeContext, PluginCall};

/// A supplier of decoder plugins (e.g. a directory of definitions)
pub trait DecoderSource: Send + Sync {
    /// Human-readable origin, used in warnings
    fn name(&self) -> String;

    /// One result per discovered entry; failed entries are skipped
    fn load(&self) -> Vec<anyhow::Result<Arc<dyn CalldataDecoder>>>;
}

/// Registry of decoder plugins sorted by descending priority
///
/// Plugins with equal priority keep their registration order. Reads work on
/// a snapshot, so a concurrent `register` never disturbs an in-flight decode.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: RwLock<Arc<Vec<Arc<dyn CalldataDecoder>>>>,
}

impl DecoderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from an explicit list of decoders
    pub fn with_decoders(decoders: Vec<Arc<dyn CalldataDecoder>>) -> Self {
        let registry = Self::new();
        registry.replace(decoders);
        registry
    }

    /// Load decoders from sources in order (e.g. project before user)
    ///
    /// Malformed entries are logged and skipped; loading never fails.
    pub fn load(sources: &[Box<dyn DecoderSource>]) -> Self {
        let mut decoders: Vec<Arc<dyn CalldataDecoder>> = Vec::new();
        for source in sources {
            for entry in source.load() {
                match entry {
                    Ok(decoder) => {
                        debug!(source = %source.name(), decoder = decoder.name(), "loaded decoder");
                        decoders.push(decoder);
                    }
                    Err(err) => {
                        warn!(source = %source.name(), error = %err, "skipping malformed decoder");
                    }
                }
            }
        }
        Self::with_decoders(decoders)
    }

    /// Add a decoder at runtime and re-sort
    pub fn register(&self, decoder: Arc<dyn CalldataDecoder>) {
        let mut decoders = self.list();
        decoders.push(decoder);
        self.replace(decoders);
    }

    /// Snapshot copy of the sorted decoder list
    pub fn list(&self) -> Vec<Arc<dyn CalldataDecoder>> {
        self.snapshot().as_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// First decoder, in priority order, whose `matches` returns true
    pub fn find_decoder(&self, data: &[u8], ctx: &DecodeContext) -> Option<Arc<dyn CalldataDecoder>> {
        self.snapshot()
            .iter()
            .find(|decoder| decoder.matches(data, ctx))
            .cloned()
    }

    /// Decode with the first matching plugin
    ///
    /// A plugin error is logged and reported as "no result".
    pub fn decode_with_plugins(&self, data: &[u8], ctx: &DecodeContext) -> Option<(String, PluginCall)> {
        let decoder = self.find_decoder(data, ctx)?;
        match decoder.decode(data, ctx) {
            Ok(Some(call)) => Some((decoder.name().to_string(), call)),
            Ok(None) => None,
            Err(err) => {
                warn!(decoder = decoder.name(), selector = %ctx.selector, error = %err, "decoder plugin failed");
                None
            }
        }
    }

    fn snapshot(&self) -> Arc<Vec<Arc<dyn CalldataDecoder>>> {
        let guard = self.decoders.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn replace(&self, mut decoders: Vec<Arc<dyn CalldataDecoder>>) {
        // Stable: equal priorities keep discovery order
        decoders.sort_by_key(|decoder| Reverse(decoder.priority()));
        let mut guard = self.decoders.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(decoders);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decoder::PluginError;

    struct Fixed {
        name: &'static str,
        priority: i32,
        claims: bool,
        fails: bool,
    }

    impl CalldataDecoder for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn matches(&self, _data: &[u8], _ctx: &DecodeContext) -> bool {
            self.claims
        }

        fn decode(&self, _data: &[u8], _ctx: &DecodeContext) -> Result<Option<PluginCall>, PluginError> {
            if self.fails {
                return Err(PluginError::Malformed("boom".into()));
            }
            Ok(Some(PluginCall::new(self.name, Vec::new())))
        }
    }

    fn fixed(name: &'static str, priority: i32, claims: bool) -> Arc<dyn CalldataDecoder> {
        Arc::new(Fixed {
            name,
            priority,
            claims,
            fails: false,
        })
    }

    struct ListSource(Vec<Option<Arc<dyn CalldataDecoder>>>);

    impl DecoderSource for ListSource {
        fn name(&self) -> String {
            "list".into()
        }

        fn load(&self) -> Vec<anyhow::Result<Arc<dyn CalldataDecoder>>> {
            self.0
                .iter()
                .map(|entry| entry.clone().ok_or_else(|| anyhow::anyhow!("bad entry")))
                .collect()
        }
    }

    fn names(registry: &DecoderRegistry) -> Vec<String> {
        registry.list().iter().map(|d| d.name().to_string()).collect()
    }

    #[test]
    fn test_sorted_by_priority_stable() {
        let registry = DecoderRegistry::with_decoders(vec![
            fixed("a", 0, true),
            fixed("b", 5, true),
            fixed("c", 0, true),
            fixed("d", 10, true),
        ]);
        assert_eq!(names(&registry), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_higher_priority_wins() {
        let registry = DecoderRegistry::with_decoders(vec![fixed("low", 5, true), fixed("high", 10, true)]);
        let ctx = DecodeContext::default();

        let (decoder, call) = registry.decode_with_plugins(&[0u8; 8], &ctx).unwrap();
        assert_eq!(decoder, "high");
        assert_eq!(call.name, "high");
    }

    #[test]
    fn test_first_match_skips_non_matching() {
        let registry = DecoderRegistry::with_decoders(vec![fixed("picky", 10, false), fixed("any", 0, true)]);
        let found = registry.find_decoder(&[0u8; 4], &DecodeContext::default()).unwrap();
        assert_eq!(found.name(), "any");
    }

    #[test]
    fn test_failing_plugin_is_no_result() {
        let broken: Arc<dyn CalldataDecoder> = Arc::new(Fixed {
            name: "broken",
            priority: 0,
            claims: true,
            fails: true,
        });
        let registry = DecoderRegistry::with_decoders(vec![broken]);
        assert!(registry.decode_with_plugins(&[0u8; 4], &DecodeContext::default()).is_none());
    }

    #[test]
    fn test_register_resorts_and_list_is_snapshot() {
        let registry = DecoderRegistry::with_decoders(vec![fixed("a", 1, true)]);
        let before = registry.list();

        registry.register(fixed("b", 2, true));

        assert_eq!(before.len(), 1);
        assert_eq!(names(&registry), vec!["b", "a"]);
    }

    #[test]
    fn test_load_skips_bad_entries_and_keeps_source_order() {
        let project: Box<dyn DecoderSource> = Box::new(ListSource(vec![Some(fixed("project", 0, true)), None]));
        let user: Box<dyn DecoderSource> = Box::new(ListSource(vec![Some(fixed("user", 0, true))]));

        let registry = DecoderRegistry::load(&[project, user]);
        assert_eq!(names(&registry), vec!["project", "user"]);
    }
}
