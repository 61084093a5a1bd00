//! Translation engine and dependency layering for the Smelter bridge.
//!
//! Two halves, deliberately coupled through one type:
//!
//! - [`translate`] compiles one [`smelter_core::Record`] into a
//!   [`DependencyDescriptor`]: a match/insert TypeQL fragment pair plus the
//!   raw list of ids the record references.
//! - [`plan_insertion`] / [`plan_deletion`] consume a batch of descriptors
//!   and order them into layers so that no fragment ever references a node
//!   that has not been written yet (or, on deletion, one already removed),
//!   surfacing missing and cyclical dependencies before any write happens.
//!
//! Translation is pure and per-record; layering is sequential within one
//! batch. Neither touches a database.

pub mod fragment;
pub mod layer;
pub mod translate;
pub mod value;

pub use fragment::{DependencyDescriptor, Fragment, VariableBinding};
pub use layer::{
    plan_deletion, plan_insertion, BatchPlan, DeleteLayer, Layer, CLEANUP_QUERY,
};
pub use translate::translate;
