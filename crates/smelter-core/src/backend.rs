//! The storage seam.
//!
//! Core and translation never open a connection; the sink drives everything
//! through [`GraphBackend`], and the actual TypeDB client lives in whichever
//! crate implements it. Tests inject a recording mock.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query rejected: {0}")]
    Query(String),

    #[error("transaction failed: {0}")]
    Transaction(String),
}

/// Minimal surface the sink needs from a TypeDB-like store.
///
/// Every call is one atomic write (or read) transaction. The sink relies on
/// a completed `insert` being durably visible before it submits the next
/// layer, since later layers' match clauses assume earlier layers' nodes are
/// already queryable.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Define (or redefine) the schema.
    async fn define_schema(&self, schema: &str) -> Result<(), BackendError>;

    /// Run one `match ... insert ...` write transaction.
    async fn insert(&self, query: &str) -> Result<(), BackendError>;

    /// Run one `match ... delete ...` write transaction.
    async fn delete(&self, query: &str) -> Result<(), BackendError>;

    /// Of the given stix-ids, return the ones already persisted.
    async fn existing_ids(&self, ids: &[String]) -> Result<Vec<String>, BackendError>;
}
