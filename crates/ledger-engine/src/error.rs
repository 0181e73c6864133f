//! # Engine Error Types
//!
//! The union of every failure an entry point can raise: domain rule
//! violations from ledger-core, storage failures from ledger-db, and
//! gateway transport failures.

use thiserror::Error;

use crate::gateway::GatewayError;
use ledger_core::{CoreError, ValidationError};
use ledger_db::DbError;

/// Errors raised by the consistency engine entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Payment gateway transport failure. Retry-safe: nothing was
    /// persisted when this is returned.
    #[error("payment gateway error: {0}")]
    Gateway(String),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl From<GatewayError> for EngineError {
    fn from(err: GatewayError) -> Self {
        EngineError::Gateway(err.0)
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
