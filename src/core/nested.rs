//! Nested call detection - finds call-like byte strings inside decoded arguments

use serde::Deserialize;

use crate::domain::abi::{ArgValue, DecodedArg};

/// Bounds on recursive nested-call discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NestedLimits {
    /// Deepest level at which a nested call is still resolved (top level is 0)
    pub max_depth: usize,
    /// Total nested resolutions allowed under one top-level decode
    pub max_nodes: usize,
}

impl Default for NestedLimits {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_nodes: 64,
        }
    }
}

/// Remaining node allowance for one top-level decode
#[derive(Debug)]
pub(crate) struct NodeBudget {
    remaining: usize,
}

impl NodeBudget {
    pub(crate) fn new(limits: &NestedLimits) -> Self {
        Self {
            remaining: limits.max_nodes,
        }
    }

    /// Take one node; false once the budget is spent
    pub(crate) fn take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Long enough to hold a selector plus at least one body byte
pub fn is_call_candidate(bytes: &[u8]) -> bool {
    bytes.len() > 4
}

/// Candidate byte strings in argument order
///
/// Looks at top-level `bytes` arguments, `bytes` elements of array
/// arguments, and `bytes` fields of records inside array arguments.
pub fn call_candidates(args: &[DecodedArg]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    for arg in args {
        match &arg.value {
            ArgValue::Bytes(bytes) => push_candidate(&mut out, bytes),
            ArgValue::List(items) => {
                for item in items {
                    match item {
                        ArgValue::Bytes(bytes) => push_candidate(&mut out, bytes),
                        ArgValue::Record(fields) => {
                            for field in fields {
                                if let ArgValue::Bytes(bytes) = &field.value {
                                    push_candidate(&mut out, bytes);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn push_candidate<'a>(out: &mut Vec<&'a [u8]>, bytes: &'a [u8]) {
    if is_call_candidate(bytes) {
        out.push(bytes);
    }
}
