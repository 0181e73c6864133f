//! # Error Types
//!
//! Domain-specific error types for ledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ledger-core errors (this file)
//! ├── CoreError        - Business rule violations
//! └── ValidationError  - Input validation failures
//!
//! ledger-db errors (separate crate)
//! └── DbError          - Database operation failures
//!
//! ledger-engine errors (separate crate)
//! └── EngineError      - CoreError ∪ DbError ∪ gateway failures
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Context in every variant (ids, available vs requested, status)
//!    so callers can render a precise user-facing message
//! 3. Errors are enum variants, never strings
//! 4. Any error raised inside a core transaction aborts it; the core
//!    never retries on its own

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the consistency engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Order, sale, buyer or product missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Stock reservation failed; names the first under-stocked product.
    /// The whole unit of work is aborted; partial decrements are never
    /// observable.
    #[error("insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Pre-payment stock re-check failed: the buyer must not be allowed
    /// to pay for something that cannot be fulfilled.
    #[error("stock issue for {product_id}: available {available}, requested {requested}")]
    StockIssue {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Blocked buyers cannot create sales.
    #[error("buyer {buyer_id} is blocked: {reason}")]
    BuyerBlocked { buyer_id: String, reason: String },

    /// Paid amount exceeds the sale total.
    #[error("invalid payment: paid {paid} exceeds total {total}")]
    InvalidPayment { paid: i64, total: i64 },

    /// Operation attempted from a status that forbids it.
    #[error("cannot {operation} while status is {current}")]
    InvalidState { current: String, operation: String },

    /// Authority guard violated: `paid` and `failed` are gateway facts,
    /// and nothing ever regresses to `pending_payment`.
    #[error("{actor} may not transition order from {from} to {to}")]
    ForbiddenTransition {
        from: String,
        to: String,
        actor: String,
    },

    /// Ownership violation: the requesting user does not own the order.
    #[error("user {user_id} does not own order {order_id}")]
    Forbidden { user_id: String, order_id: String },

    /// Payment already succeeded; no further intent may be created.
    #[error("order {order_id} is already paid")]
    AlreadyPaid { order_id: String },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g. malformed UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = CoreError::InsufficientStock {
            product_id: "prod-1".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for prod-1: available 2, requested 3"
        );

        let err = CoreError::BuyerBlocked {
            buyer_id: "warung-7".to_string(),
            reason: "overdue receivables".to_string(),
        };
        assert!(err.to_string().contains("overdue receivables"));

        let err = CoreError::InvalidPayment {
            paid: 120_000,
            total: 100_000,
        };
        assert!(err.to_string().contains("120000"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
