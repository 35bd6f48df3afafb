//! # Error Types
//!
//! Domain-specific error types for tienda-core.
//!
//! ## Error Flow
//! ```text
//! ValidationError → CoreError → SettlementError → ApiError → caller
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, amounts, order number)
//! 3. Errors are enum variants, never bare strings

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations in the settlement domain.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product referenced by a sale line does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is soft-deleted and cannot be sold.
    #[error("Product {code} is inactive")]
    ProductInactive { code: String },

    /// Requested quantity exceeds available stock.
    ///
    /// Raised pre-commit: the whole sale fails, nothing is persisted.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// QR checkout not found.
    #[error("Checkout not found: {0}")]
    CheckoutNotFound(String),

    /// Cancellation of a sale that is already cancelled.
    #[error("Sale {order_number} is already cancelled")]
    AlreadyCancelled { order_number: String },

    /// Sale totals must come out strictly positive.
    #[error("Sale total must be positive, got {total}")]
    NonPositiveTotal { total: Money },

    /// Payment amount would push completed payments past the sale total.
    #[error("Payment of {requested} exceeds outstanding balance of {outstanding}")]
    PaymentExceedsBalance {
        requested: Money,
        outstanding: Money,
    },

    /// Payment amount is zero or negative.
    #[error("Payment amount must be positive, got {amount}")]
    NonPositivePayment { amount: Money },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the boundary, before any business logic runs or anything
/// is persisted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Collection has too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
