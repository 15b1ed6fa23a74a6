//! Calldata resolver - plugins, then catalog, then selector lookup, then opaque

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use tracing::debug;

use super::nested::{call_candidates, NestedLimits, NodeBudget};
use super::ResolveError;
use crate::domain::abi::{DecodedArg, DecodedCall, Resolution};
use crate::domain::decoder::{DecodeContext, DecoderRegistry};
use crate::infrastructure::abi::{InterfaceCatalog, SelectorCache};

/// Resolves raw calldata into a [`DecodedCall`] tree
///
/// Stages run strictly in order and the first success wins:
/// 1. decoder plugins (output returned as-is, no nested detection)
/// 2. the interface catalog (followed by nested detection over its args)
/// 3. the selector cache / remote signature databases
/// 4. an opaque call exposing only the selector and body
pub struct CalldataResolver {
    plugins: Arc<DecoderRegistry>,
    catalog: Arc<InterfaceCatalog>,
    selectors: Arc<SelectorCache>,
    limits: NestedLimits,
}

impl CalldataResolver {
    pub fn new(
        plugins: Arc<DecoderRegistry>,
        catalog: Arc<InterfaceCatalog>,
        selectors: Arc<SelectorCache>,
    ) -> Self {
        Self {
            plugins,
            catalog,
            selectors,
            limits: NestedLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: NestedLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn plugins(&self) -> &DecoderRegistry {
        &self.plugins
    }

    pub fn catalog(&self) -> &InterfaceCatalog {
        &self.catalog
    }

    pub fn selectors(&self) -> &SelectorCache {
        &self.selectors
    }

    /// Resolve a payload; fails only when it is shorter than a selector
    pub async fn resolve(&self, data: &[u8], ctx: &DecodeContext) -> Result<DecodedCall, ResolveError> {
        let mut budget = NodeBudget::new(&self.limits);
        self.resolve_at(data, ctx, 0, &mut budget).await
    }

    /// Resolve a `0x`-prefixed (or bare) hex payload
    pub async fn resolve_hex(&self, input: &str, ctx: &DecodeContext) -> Result<DecodedCall, ResolveError> {
        let data = decode_hex(input)?;
        self.resolve(&data, ctx).await
    }

    /// Resolve several payloads concurrently; each outcome is independent
    pub async fn resolve_many(
        &self,
        payloads: &[Vec<u8>],
        ctx: &DecodeContext,
    ) -> Vec<Result<DecodedCall, ResolveError>> {
        future::join_all(payloads.iter().map(|data| self.resolve(data, ctx))).await
    }

    fn resolve_at<'a>(
        &'a self,
        data: &'a [u8],
        ctx: &'a DecodeContext,
        depth: usize,
        budget: &'a mut NodeBudget,
    ) -> BoxFuture<'a, Result<DecodedCall, ResolveError>> {
        async move {
            if data.len() < 4 {
                return Err(ResolveError::InvalidCalldata { len: data.len() });
            }
            let selector = hex::encode(&data[..4]);
            let body = &data[4..];
            let ctx = ctx.for_selector(selector.clone());

            if let Some((decoder, call)) = self.plugins.decode_with_plugins(data, &ctx) {
                debug!(selector = %selector, decoder = %decoder, depth, "resolved by plugin");
                return Ok(DecodedCall {
                    selector,
                    name: Some(call.name),
                    signature: None,
                    args: call.params,
                    nested: call.nested,
                    resolution: Resolution::Plugin { decoder },
                });
            }

            if let Some(mut call) = self.catalog.resolve_by_catalog(data) {
                debug!(selector = %selector, name = ?call.name, depth, "resolved by catalog");
                call.nested = self.detect_nested(&call.args, &ctx, depth, budget).await;
                return Ok(call);
            }

            let signatures = self.selectors.lookup(&format!("0x{}", selector)).await;
            // Last candidate wins; the databases give no ranking to prefer
            if let Some(best) = signatures.last() {
                debug!(selector = %selector, signature = %best, depth, "named by signature lookup");
                return Ok(DecodedCall {
                    selector,
                    name: None,
                    signature: Some(best.clone()),
                    args: opaque_args(body),
                    nested: Vec::new(),
                    resolution: Resolution::SignatureLookup,
                });
            }

            Ok(opaque_call(selector, body, Resolution::Opaque))
        }
        .boxed()
    }

    /// Resolve every call-like argument, depth-first in argument order
    ///
    /// Only resolved children are kept. Past the depth limit, or once the
    /// node budget is spent, a candidate is kept as a truncated opaque node.
    async fn detect_nested(
        &self,
        args: &[DecodedArg],
        ctx: &DecodeContext,
        depth: usize,
        budget: &mut NodeBudget,
    ) -> Vec<DecodedCall> {
        let mut nested = Vec::new();
        for candidate in call_candidates(args) {
            if depth >= self.limits.max_depth || !budget.take() {
                nested.push(truncated_call(candidate));
                continue;
            }
            match self.resolve_at(candidate, ctx, depth + 1, budget).await {
                Ok(call) if call.is_resolved() => nested.push(call),
                Ok(call) => {
                    debug!(selector = %call.selector, depth = depth + 1, "nested candidate left unresolved");
                }
                Err(err) => {
                    debug!(error = %err, "nested candidate rejected");
                }
            }
        }
        nested
    }
}

fn decode_hex(input: &str) -> Result<Vec<u8>, ResolveError> {
    let trimmed = input.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(payload).map_err(|err| ResolveError::InvalidHex(err.to_string()))
}

fn opaque_args(body: &[u8]) -> Vec<DecodedArg> {
    if body.is_empty() {
        Vec::new()
    } else {
        vec![DecodedArg::opaque(body)]
    }
}

fn opaque_call(selector: String, body: &[u8], resolution: Resolution) -> DecodedCall {
    DecodedCall {
        selector,
        name: None,
        signature: None,
        args: opaque_args(body),
        nested: Vec::new(),
        resolution,
    }
}

fn truncated_call(data: &[u8]) -> DecodedCall {
    opaque_call(hex::encode(&data[..4]), &data[4..], Resolution::Truncated)
}
