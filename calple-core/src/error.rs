//! Error types for calple operations.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by calple domain operations.
///
/// Variants map one-to-one onto HTTP status codes at the API layer:
/// 401, 400, 403, 404, 409 and 500 in declaration order.
#[derive(Error, Debug)]
pub enum CalpleError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for calple operations.
pub type CalpleResult<T> = Result<T, CalpleError>;
