//! Input checks shared by every procedure input type.
//!
//! Inputs are validated after deserialization and before any work runs. The
//! first failing rule wins and its message is returned to the caller verbatim.

use thiserror::Error;

/// Largest amount accepted for counted quantities (Postgres `INTEGER`).
pub const MAX_AMOUNT: i64 = 2_147_483_647;

pub const MAX_AMOUNT_MESSAGE: &str = "Number must be below 2147483647";

/// A rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InputError {
    pub field: &'static str,
    pub message: String,
}

impl InputError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type InputResult<T> = Result<T, InputError>;

/// Validation and normalization of a procedure input.
///
/// Implementations trim string fields in place and return the cleaned value.
pub trait Validate: Sized {
    fn validate(self) -> InputResult<Self>;
}

/// Trims `value` and rejects it when nothing is left.
pub fn required(value: &mut String, field: &'static str, message: &str) -> InputResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InputError::new(field, message));
    }
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
    Ok(())
}

/// Rejects an empty identifier without altering it.
pub fn required_id(value: &str, field: &'static str, message: &str) -> InputResult<()> {
    if value.trim().is_empty() {
        return Err(InputError::new(field, message));
    }
    Ok(())
}

pub fn positive(value: f64, field: &'static str, message: &str) -> InputResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(InputError::new(field, message));
    }
    Ok(())
}

pub fn finite(value: f64, field: &'static str, message: &str) -> InputResult<()> {
    if !value.is_finite() {
        return Err(InputError::new(field, message));
    }
    Ok(())
}

/// Positive quantity that still fits an `INTEGER` column.
pub fn bounded_amount(value: f64, field: &'static str, message: &str) -> InputResult<()> {
    positive(value, field, message)?;
    if value > MAX_AMOUNT as f64 {
        return Err(InputError::new(field, MAX_AMOUNT_MESSAGE));
    }
    Ok(())
}

/// Whole-number counterpart of [`bounded_amount`] for head counts.
pub fn bounded_count(value: i64, field: &'static str, message: &str) -> InputResult<()> {
    if value <= 0 {
        return Err(InputError::new(field, message));
    }
    if value > MAX_AMOUNT {
        return Err(InputError::new(field, MAX_AMOUNT_MESSAGE));
    }
    Ok(())
}

pub fn in_range(
    value: i64,
    min: i64,
    max: i64,
    field: &'static str,
    message: &str,
) -> InputResult<()> {
    if value < min || value > max {
        return Err(InputError::new(field, message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_in_place() {
        let mut name = "  Tower B  ".to_string();
        required(&mut name, "projectName", "A project name is required").unwrap();
        assert_eq!(name, "Tower B");
    }

    #[test]
    fn test_required_rejects_whitespace() {
        let mut name = "   ".to_string();
        let err = required(&mut name, "projectName", "A project name is required").unwrap_err();
        assert_eq!(err.field, "projectName");
        assert_eq!(err.to_string(), "A project name is required");
    }

    #[test]
    fn test_bounded_amount() {
        assert!(bounded_amount(1.0, "plantAmount", "Quantity must be positive").is_ok());
        assert_eq!(
            bounded_amount(0.0, "plantAmount", "Quantity must be positive")
                .unwrap_err()
                .message,
            "Quantity must be positive"
        );
        assert_eq!(
            bounded_amount(2_147_483_648.0, "plantAmount", "Quantity must be positive")
                .unwrap_err()
                .message,
            MAX_AMOUNT_MESSAGE
        );
        assert!(bounded_amount(MAX_AMOUNT as f64, "plantAmount", "x").is_ok());
    }

    #[test]
    fn test_positive_rejects_nan() {
        assert!(positive(f64::NAN, "subtotal", "Subtotal must be positive").is_err());
        assert!(positive(-3.0, "subtotal", "Subtotal must be positive").is_err());
    }
}
