//! SQLite persistence: selector lookups and address labels

mod labels;
mod selector_store;

pub use labels::LabelStore;
pub use selector_store::SelectorStore;
