//! Business rule and input errors shared by every layer.
//!
//! ```text
//!   ValidationError ──► CoreError ──► DbError::Rule ──► ApiError
//!   (shape of input)    (stock, splits,   (haze-db)        (400 / 401 / 404 / 409)
//!                        balances, admins)
//! ```

use thiserror::Error;

use crate::money::Money;

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale, tester or damage quantity above what is on the shelf.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The cash / digital / due parts do not add up to the total.
    #[error("Payment split {allocated} does not match total {total}")]
    SplitMismatch { total: Money, allocated: Money },

    /// A settlement is larger than what is still owed.
    #[error("Payment of {offered} exceeds outstanding balance {outstanding}")]
    Overpayment { outstanding: Money, offered: Money },

    #[error("Nothing outstanding on {0}")]
    NothingOutstanding(String),

    #[error("Cost price {cost} cannot exceed selling price {selling}")]
    CostAboveSellingPrice { cost: Money, selling: Money },

    #[error("Sale must contain at least one item")]
    EmptySale,

    #[error("Sale cannot have more than {max} items")]
    TooManyItems { max: usize },

    /// Capital entries move real money; they cannot be left due.
    #[error("Capital entries cannot carry a due amount")]
    CapitalWithDue,

    /// The operation would leave the shop without an administrator.
    #[error("At least one admin account must remain")]
    LastAdmin,

    /// Deliberately does not say which half was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Malformed request input, caught before any rule or query runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Missing, or blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Emails, phone numbers and enum strings that do not parse.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product: "Mango Ice 50ml".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Mango Ice 50ml: available 3, requested 5"
        );
    }

    #[test]
    fn test_split_mismatch_message() {
        let err = CoreError::SplitMismatch {
            total: Money::from_cents(1000),
            allocated: Money::from_cents(900),
        };
        assert_eq!(err.to_string(), "Payment split 9.00 does not match total 10.00");
    }

    #[test]
    fn test_validation_field_and_conversion() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.field(), "name");
        assert_eq!(err.to_string(), "name is required");

        let core_err: CoreError = err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
