//! # Error Types
//!
//! Domain-specific error types for cartflow-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  CartError          - Everything a cart operation can return           │
//! │  ├── StorageError   - Raised by a storage engine (incl. index errors)  │
//! │  └── ValidationError- Quantity / line limits, settings validation      │
//! │                                                                         │
//! │  Flow: RecordStore → StorageError → CartError → host application       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error
//! Firing a checkout event from a state that does not allow it is a silent
//! no-op. The state machine reports it through its return value only.

use thiserror::Error;

// =============================================================================
// Cart Error
// =============================================================================

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// An accessor that the concrete cart type must provide was not provided.
    ///
    /// ## When This Occurs
    /// - `invoice_id()` called on a cart whose hooks keep the default
    #[error("{accessor} must be provided by the concrete cart type")]
    NotImplemented { accessor: &'static str },

    /// A stored line's price could not be read as money.
    ///
    /// ## When This Occurs
    /// - A record row has no price value
    /// - A record row's price column holds something that is not a number
    /// - A record row's price column is negative
    #[error("Price of item {item} could not be converted: '{value}'")]
    PriceConversion { item: String, value: String },

    /// An amount no longer fits in the money type.
    ///
    /// ## When This Occurs
    /// - A line's price times its quantity overflows
    /// - Summing lines or order totals overflows
    #[error("Amount overflowed while computing {context}")]
    AmountOverflow { context: String },

    /// The storage engine failed. Surfaced verbatim.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A quantity or line limit was violated.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An order total strategy failed; the whole computation is aborted.
    #[error("Order total '{name}' failed: {reason}")]
    TotalFailed { name: String, reason: String },

    /// Settings were loaded but are not usable.
    #[error("Invalid cart configuration: {0}")]
    InvalidConfig(String),

    /// Settings file could not be read or parsed.
    #[error("Failed to load cart configuration: {0}")]
    ConfigLoadFailed(String),
}

impl CartError {
    /// Creates a PriceConversion error for an item.
    pub fn price_conversion(item: impl Into<String>, value: impl Into<String>) -> Self {
        CartError::PriceConversion {
            item: item.into(),
            value: value.into(),
        }
    }

    /// Creates an AmountOverflow error for the named computation.
    pub fn amount_overflow(context: impl Into<String>) -> Self {
        CartError::AmountOverflow {
            context: context.into(),
        }
    }

    /// Creates a TotalFailed error for the named strategy.
    pub fn total_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CartError::TotalFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for CartError {
    fn from(err: std::io::Error) -> Self {
        CartError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CartError {
    fn from(err: toml::de::Error) -> Self {
        CartError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Storage Error
// =============================================================================

/// Errors raised by a storage engine.
///
/// Cart code never wraps or retries these; they reach the caller as
/// `CartError::Storage`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Index outside the stored lines.
    ///
    /// Should not happen through the public cart API while invariants hold.
    /// Indicates an engine bug or a row removed behind the cart's back.
    #[error("Index {index} out of bounds for {len} stored lines")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The external row owner rejected or failed an operation.
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a Backend error from any message.
    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend(message.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a cart mutates anything, so a failed call leaves the cart
/// as it was.
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

    /// Duplicate value (e.g., two order totals with the same name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CartError.
pub type CartResult<T> = Result<T, CartError>;

/// Convenience type alias for storage engine Results.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Unit Tests
// =============================================================================
