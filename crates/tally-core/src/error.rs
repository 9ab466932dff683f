//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger and lookup failures                     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage and codec failures                     │
//! │                                                                         │
//! │  tally-sync errors (separate crate)                                    │
//! │  └── SyncError        - Transport and reconciliation failures          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger and the entity mutators.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Entity not found in {collection}: {id}")]
    EntityNotFound { collection: &'static str, id: String },

    /// The transaction is in a state that does not allow the operation.
    ///
    /// ## When This Occurs
    /// - Reversing a sale that was already cancelled
    /// - Registering a payment on a cancelled or returned sale
    #[error("Transaction {transaction_id} is {status:?}, cannot {operation}")]
    InvalidSaleStatus {
        transaction_id: String,
        status: TransactionStatus,
        operation: &'static str,
    },

    /// A credit sale would push the customer past their limit.
    ///
    /// ## User Workflow
    /// ```text
    /// Credit sale 300.00 to customer (limit 500.00, owes 250.00)
    ///      │
    ///      ▼
    /// 250.00 + 300.00 > 500.00
    ///      │
    ///      ▼
    /// CreditLimitExceeded { available: 250.00, requested: 300.00 }
    /// ```
    #[error("Credit limit exceeded for customer {customer_id}: available {available}, requested {requested}")]
    CreditLimitExceeded {
        customer_id: String,
        available: Money,
        requested: Money,
    },

    #[error("Purchase {0} was already received")]
    PurchaseAlreadyReceived(String),

    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: i64 },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::CreditLimitExceeded {
            customer_id: "4".to_string(),
            available: Money::from_cents(25_000),
            requested: Money::from_cents(30_000),
        };
        assert_eq!(
            err.to_string(),
            "Credit limit exceeded for customer 4: available 250.00, requested 300.00"
        );

        let err = CoreError::InvalidSaleStatus {
            transaction_id: "9".to_string(),
            status: TransactionStatus::Cancelled,
            operation: "reverse",
        };
        assert_eq!(err.to_string(), "Transaction 9 is Cancelled, cannot reverse");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
