//! Write orchestration for a TypeDB-backed STIX store.
//!
//! [`TypeDbSink`] drives a [`smelter_core::GraphBackend`] implementation:
//! it bootstraps the schema plus the standard TLP markings, plans every add
//! or delete batch through `smelter-typeql`, resolves unmet references
//! against the store, and executes the resulting layers in order. All
//! validation happens before the first write.

pub mod config;
pub mod markings;
pub mod sink;

pub use config::{ConfigError, StoreConfig};
pub use markings::INITIAL_MARKINGS;
pub use sink::TypeDbSink;
