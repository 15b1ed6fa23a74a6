//! Resolution engine: the calldata resolver and nested call detection

mod error;
mod nested;
mod resolver;

pub use error::ResolveError;
pub use nested::{call_candidates, is_call_candidate, NestedLimits};
pub use resolver::CalldataResolver;
