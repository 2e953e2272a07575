//! Error types for the engine.
//!
//! The codec, projection and query compiler never fail: malformed input
//! degrades to a fallback encoding or a skipped predicate. Errors come only
//! from validation and from record mutations that cannot be expressed.

use crate::validate::ValidationError;
use thiserror::Error;

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("the identifier attribute '{0}' cannot be unset")]
    IdentifierUnset(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
