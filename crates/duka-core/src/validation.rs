//! # Validation Module
//!
//! Checks run before anything is written. A payment that fails here never
//! reaches the database.
//!
//! ## Usage
//! ```rust
//! use duka_core::validation::validate_payment_amount;
//! use duka_core::Money;
//!
//! let ceiling = Money::from_cents(1_000_000);
//! assert!(validate_payment_amount(Money::from_cents(30_000), ceiling).is_ok());
//! assert!(validate_payment_amount(Money::zero(), ceiling).is_err());
//! assert!(validate_payment_amount(Money::from_cents(2_000_000), ceiling).is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a payment amount against the configured ceiling.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `ceiling`
pub fn validate_payment_amount(amount: Money, ceiling: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::invalid_amount(format!(
            "{} is not positive",
            amount
        )));
    }

    if amount > ceiling {
        return Err(CoreError::invalid_amount(format!(
            "{} exceeds the maximum of {}",
            amount, ceiling
        )));
    }

    Ok(())
}

/// Validates a customer identifier.
pub fn validate_customer_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a client sale id: must be a UUID.
///
/// Capture assigns these once with `Uuid::new_v4()`; anything else came
/// from a corrupted retry.
pub fn validate_client_sale_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "client_sale_id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "client_sale_id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates the configured payment ceiling itself.
pub fn validate_ceiling_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "max_payment_cents".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_payment_amount() {
        let ceiling = Money::from_cents(10_000);

        assert!(validate_payment_amount(Money::from_cents(1), ceiling).is_ok());
        assert!(validate_payment_amount(ceiling, ceiling).is_ok());

        let err = validate_payment_amount(Money::zero(), ceiling).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
        assert!(validate_payment_amount(Money::from_cents(-500), ceiling).is_err());

        let err = validate_payment_amount(Money::from_cents(10_001), ceiling).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid payment amount: KES 100.01 exceeds the maximum of KES 100.00"
        );
    }

    #[test]
    fn test_validate_customer_id() {
        assert!(validate_customer_id("cust-1").is_ok());
        assert!(validate_customer_id("").is_err());
        assert!(validate_customer_id("   ").is_err());
    }

    #[test]
    fn test_validate_client_sale_id() {
        assert!(validate_client_sale_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_client_sale_id("").is_err());
        assert!(validate_client_sale_id("retry-1").is_err());
    }

    #[test]
    fn test_validate_ceiling_cents() {
        assert!(validate_ceiling_cents(1).is_ok());
        assert!(validate_ceiling_cents(0).is_err());
    }
}
