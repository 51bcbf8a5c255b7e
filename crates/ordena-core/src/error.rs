//! # Error Types
//!
//! Domain-specific error types for ordena-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ordena-core errors (this file)                                        │
//! │  ├── OrderError       - Order placement / status failures              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ordena-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → OrderError ◄── DbError (mapped by service)    │
//! │                                                                         │
//! │  An HTTP layer maps OrderError variants to status codes:               │
//! │    ProductNotFound / OrderNotFound / ClientNotFound    → 404           │
//! │    InsufficientStock / InvalidLineItem / InvalidStatus → 400           │
//! │    PersistenceConflict                                 → 409 (retry)   │
//! │    StorageUnavailable                                  → 503           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, quantities, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each variant has a distinct, stable message a client can rely on

use thiserror::Error;

// =============================================================================
// Order Error
// =============================================================================

/// Errors from order placement and status updates.
///
/// Assembly-time variants carry no side effects: when one is returned, no
/// stock has been touched and nothing was persisted. Commit-time variants
/// are only returned after a full rollback.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A requested product id does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock to satisfy a line item.
    ///
    /// ## When This Occurs
    /// - At assembly, when the requested quantity exceeds current stock
    /// - At commit, when stock was depleted concurrently between assembly
    ///   and the transaction (the whole transaction is rolled back first)
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The request shape is invalid: empty line list, non-positive
    /// quantity, or a quantity over the per-line cap.
    #[error("Invalid line item: {0}")]
    InvalidLineItem(#[from] ValidationError),

    /// The target status is not one of the five recognized values.
    #[error("Invalid order status: '{0}'")]
    InvalidStatusTransition(String),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The referenced client does not exist.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// The commit transaction aborted due to a concurrent write conflict.
    /// Everything was rolled back; the caller may retry the whole
    /// operation from assembly against fresh stock reads.
    #[error("Persistence conflict, safe to retry: {0}")]
    PersistenceConflict(String),

    /// The storage backend is unavailable. Fatal for this request; not
    /// retried automatically.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl OrderError {
    /// Whether the caller may safely retry the whole operation.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, OrderError::PersistenceConflict(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate product code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with OrderError.
pub type OrderResult<T> = Result<T, OrderError>;

// =============================================================================
// Unit Tests
// =============================================================================
