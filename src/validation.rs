// Validation utilities module
// Custom validation functions used by request DTOs

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

/// Largest quantity a cart or order line may carry; keeps line totals
/// inside the NUMERIC(12,2) money columns
pub const MAX_LINE_QUANTITY: i32 = 1000;

// optional leading +, then 6-20 digits with optional spaces or dashes
static CONTACT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9](?:[0-9 \-]{4,18})[0-9]$").unwrap());

/// Validates a phone-style contact number, e.g. "+880 1711-000000"
pub fn validate_contact_number(value: &str) -> Result<(), ValidationError> {
    if CONTACT_NUMBER.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_contact_number"))
    }
}

/// Validates that an amount of money is not negative
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else {
        Ok(())
    }
}
