use thiserror::Error;

/// Errors surfaced by [`CalldataResolver`](super::CalldataResolver)
///
/// Everything past these preconditions degrades to a less informative
/// decode instead of failing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid calldata: {len} bytes, need at least 4 for a selector")]
    InvalidCalldata { len: usize },

    #[error("invalid hex calldata: {0}")]
    InvalidHex(String),
}
