//! Decoder plugin adapters

mod declarative;

pub use declarative::{DeclarativeDecoder, DecoderDefinition, DecoderDir};
