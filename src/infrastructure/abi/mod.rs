//! ABI infrastructure - Alloy-based catalog, decoding and signature lookup

mod builtin;
mod catalog;
mod decoder;
mod resolver;
mod scanner;
mod selector_cache;

pub use builtin::BuiltinSource;
pub use catalog::InterfaceCatalog;
pub use decoder::AlloyAbiDecoder;
pub use resolver::{remote_sources, FourByteSource, OpenChainSource, SignatureSource};
pub use scanner::{parse_catalog_document, AbiFile, AbiScanner};
pub use selector_cache::{SelectorCache, DEFAULT_LOOKUP_TIMEOUT};
