// Errors raised by model operations that can legitimately fail.
//
// Most model mutators treat a missing entity as a no-op rather than an
// error; `ModelError` covers the few cases where the caller must decide
// what to do (malformed identifiers, ambiguous initiative reconciliation).

use thiserror::Error;

use crate::types::Guid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid asset id {0:?}: expected 32 lowercase hex digits")]
    InvalidAssetId(String),

    #[error("invalid guid {0:?}")]
    InvalidGuid(String),

    #[error("token {token} matches {matches} initiative entries")]
    AmbiguousInitiative { token: Guid, matches: usize },
}
