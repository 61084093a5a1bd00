//! Error taxonomy shared across translation, planning, and orchestration.
//!
//! Fatal translation errors always carry the record id, and field-level
//! errors the field name, so a failed batch can be traced back to the exact
//! input that caused it.

use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum SmelterError {
    /// The record's kind is not present in the schema mapping registry.
    #[error("unknown record kind `{kind}` for {id}")]
    UnknownKind { id: String, kind: String },

    /// A property value whose JSON type has no TypeQL literal form.
    #[error("unsupported value for {id}.{field}: {value}")]
    UnsupportedValue {
        id: String,
        field: String,
        value: String,
    },

    /// A granular-marking selector that names no property variable generated
    /// earlier in the same record's translation.
    #[error("marking selector `{selector}` on {id} does not resolve to a property variable")]
    SelectorUnresolved { id: String, selector: String },

    /// An id that is not of the form `<kind>--<uuid>`, or whose prefix does
    /// not match the record's declared kind.
    #[error("invalid record id `{id}`: {reason}")]
    InvalidId { id: String, reason: String },

    /// Referenced ids that are neither in the batch nor already persisted.
    /// Raised before any write; the whole batch is rejected.
    #[error("batch depends on records that are neither in the batch nor in the store: {ids:?}")]
    MissingDependencies { ids: Vec<String> },

    /// Records whose reference chains mutually require each other.
    /// Raised before any write; the whole batch is rejected.
    #[error("batch contains cyclically dependent records: {ids:?}")]
    CyclicalDependencies { ids: Vec<String> },

    /// Batch input that is neither a record, a list of records, nor a bundle.
    #[error("malformed batch input: {0}")]
    MalformedBatch(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type SmelterResult<T> = Result<T, SmelterError>;
