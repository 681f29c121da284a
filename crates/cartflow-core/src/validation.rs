//! # Validation Module
//!
//! Limit checks run by the cart before it mutates storage, and by
//! `CartSettings::validate` before a configuration is accepted.
//!
//! ## Where Checks Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_to_cart(item, 5)                                                   │
//! │       │                                                                 │
//! │       ├── validate_quantity(5, max)        qty == 0 / qty > max?       │
//! │       │                                                                 │
//! │       ├── merge:  validate_merged_quantity(stored, 5, max)             │
//! │       │                                                                 │
//! │       └── append: validate_line_count(lines, max_lines)                │
//! │                                                                         │
//! │  A `None` limit is not enforced. Zero quantities are always rejected.  │
//! │                                                                         │
//! │  remove_from_cart is NEVER validated: removing too much empties the    │
//! │  line, removing an absent line is a no-op.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `max`, when there is one
///
/// ## Example
/// ```rust
/// use cartflow_core::validation::validate_quantity;
///
/// assert!(validate_quantity(5, Some(999)).is_ok());
/// assert!(validate_quantity(0, None).is_err());
/// assert!(validate_quantity(1000, Some(999)).is_err());
/// assert!(validate_quantity(1000, None).is_ok());
/// ```
pub fn validate_quantity(qty: u32, max: Option<u32>) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    match max {
        Some(max) if qty > max => Err(quantity_out_of_range(max)),
        _ => Ok(()),
    }
}

/// Adds `extra` units to a stored line quantity and validates the result.
///
/// A sum that does not fit in a `u32` is out of range even without a limit.
pub fn validate_merged_quantity(stored: u32, extra: u32, max: Option<u32>) -> ValidationResult<u32> {
    let merged = stored
        .checked_add(extra)
        .ok_or_else(|| quantity_out_of_range(max.unwrap_or(u32::MAX)))?;
    validate_quantity(merged, max)?;
    Ok(merged)
}

fn quantity_out_of_range(max: u32) -> ValidationError {
    ValidationError::OutOfRange {
        field: "quantity".to_string(),
        min: 1,
        max: i64::from(max),
    }
}

/// Validates that one more line fits in the cart.
pub fn validate_line_count(current_lines: usize, max_lines: Option<usize>) -> ValidationResult<()> {
    match max_lines {
        Some(max_lines) if current_lines >= max_lines => Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: i64::try_from(max_lines).unwrap_or(i64::MAX),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Settings Validators
// =============================================================================

/// Validates a rate in basis points (0% to 100%).
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates an amount in cents. Zero is allowed (free shipping).
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an order total name.
pub fn validate_total_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "total name".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
