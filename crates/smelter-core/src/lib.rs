//! Core types for the Smelter STIX-to-TypeQL bridge.
//!
//! This crate defines the pieces every other Smelter crate shares:
//!
//! - [`Record`] and [`StixId`]: a thin, order-preserving view over one STIX
//!   2.1 object as parsed JSON.
//! - [`SchemaRegistry`]: the immutable mapping from `(kind, field)` to the
//!   TypeQL attribute/relation names that translation needs. Loaded once,
//!   passed explicitly into every translation call.
//! - [`ScalarValue`]: the closed set of scalar kinds the query encoder
//!   accepts, plus coercion from raw JSON.
//! - [`SmelterError`]: the shared error taxonomy.
//! - [`backend::GraphBackend`]: the seam behind which the actual TypeDB
//!   connection machinery lives. Core and translation never touch a socket;
//!   higher-level crates inject an implementation.

pub mod backend;
pub mod error;
pub mod id;
pub mod record;
pub mod registry;
pub mod value;

pub use backend::{BackendError, GraphBackend};
pub use error::{SmelterError, SmelterResult};
pub use id::StixId;
pub use record::Record;
pub use registry::{FieldMapping, SchemaRegistry};
pub use value::{ScalarValue, ValueKind};
