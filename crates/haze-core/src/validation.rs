//! # Validation Module
//!
//! Input validation for every write the API accepts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (haze-api)                                              │
//! │  └── Type validation (serde deserialization of the JSON body)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Field rules: lengths, ranges, formats, cost ≤ selling             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Repository transaction (haze-db)                             │
//! │  └── Stock availability, outstanding balances                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                       │
//! │  └── NOT NULL, UNIQUE, FOREIGN KEY, CHECK constraints                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters).
///
/// ```rust
/// use haze_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Strawberry Kiwi 60ml").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

/// Validates a product or expense category (1-100 characters).
pub fn validate_category(category: &str) -> ValidationResult<()> {
    validate_text("category", category, 100)
}

/// Validates a person's display name (1-100 characters).
pub fn validate_person_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 100)
}

/// Validates an optional free-text note (at most 1000 characters).
pub fn validate_note(field: &str, note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(text) if text.chars().count() > 1000 => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 1000,
        }),
        _ => Ok(()),
    }
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@` with text on both sides
/// - A dot in the domain part
/// - No whitespace, at most 254 characters
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_text("email", email, 254)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid()),
    };

    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates an optional phone number: digits plus `+ - ( )` and spaces,
/// 6-20 characters.
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<()> {
    let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(());
    };

    if !(6..=20).contains(&phone.len()) {
        return Err(ValidationError::OutOfRange {
            field: "phone length".to_string(),
            min: 6,
            max: 20,
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "may only contain digits, spaces and + - ( )".to_string(),
        });
    }

    Ok(())
}

/// Validates a new password (8-128 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();
    if len < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }
    if len > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

/// Validates a search query (at most 100 characters). Returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity (1..=MAX_ITEM_QUANTITY).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Error for an amount above [`MAX_AMOUNT_CENTS`] or one that would overflow.
pub fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: MAX_AMOUNT_CENTS,
    }
}

/// Validates a price in cents (0..=MAX_AMOUNT_CENTS). Zero is allowed
/// (giveaways).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if cents > MAX_AMOUNT_CENTS {
        return Err(amount_out_of_range(field));
    }

    Ok(())
}

/// Validates a strictly positive amount in cents, at most MAX_AMOUNT_CENTS.
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if cents > MAX_AMOUNT_CENTS {
        return Err(amount_out_of_range(field));
    }

    Ok(())
}

/// Validates one part of a payment split or settlement
/// (0..=MAX_AMOUNT_CENTS).
pub fn validate_split_part(field: &str, cents: i64) -> ValidationResult<()> {
    validate_price_cents(field, cents)
}

/// Validates a low-stock threshold (0..=MAX_ITEM_QUANTITY).
pub fn validate_threshold(threshold: i64) -> ValidationResult<()> {
    if !(0..=MAX_ITEM_QUANTITY).contains(&threshold) {
        return Err(ValidationError::OutOfRange {
            field: "low stock threshold".to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a cost / selling price pair.
///
/// ## Rules
/// - Both prices are non-negative
/// - Cost never exceeds selling price
///
/// ```rust
/// use haze_core::validation::validate_pricing;
///
/// assert!(validate_pricing(800, 1400).is_ok());
/// assert!(validate_pricing(1500, 1400).is_err());
/// ```
pub fn validate_pricing(cost_cents: i64, selling_cents: i64) -> CoreResult<()> {
    validate_price_cents("cost price", cost_cents)?;
    validate_price_cents("selling price", selling_cents)?;

    if cost_cents > selling_cents {
        return Err(CoreError::CostAboveSellingPrice {
            cost: Money::from_cents(cost_cents),
            selling: Money::from_cents(selling_cents),
        });
    }

    Ok(())
}

// =============================================================================
// Collection / Range Validators
// =============================================================================

/// Validates the number of line items on a sale.
pub fn validate_sale_size(items: usize) -> CoreResult<()> {
    if items == 0 {
        return Err(CoreError::EmptySale);
    }
    if items > MAX_SALE_ITEMS {
        return Err(CoreError::TooManyItems {
            max: MAX_SALE_ITEMS,
        });
    }
    Ok(())
}

/// Validates an optional date window: `from` must not be after `to`.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: format!("from ({from}) is after to ({to})"),
            });
        }
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Mint Salt Nic 20mg").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@hazeshop.com").is_ok());
        assert!(validate_email("a.b@c.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("two@@signs.com").is_err());
        assert!(validate_email("@nolocal.com").is_err());
        assert!(validate_email("nodot@domain").is_err());
        assert!(validate_email("with space@domain.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone(None).is_ok());
        assert!(validate_phone(Some("")).is_ok());
        assert!(validate_phone(Some("+880 1711-000000")).is_ok());
        assert!(validate_phone(Some("12")).is_err());
        assert!(validate_phone(Some("call me maybe")).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_pricing() {
        assert!(validate_pricing(0, 0).is_ok());
        assert!(validate_pricing(1000, 1000).is_ok());
        assert!(matches!(
            validate_pricing(1001, 1000),
            Err(CoreError::CostAboveSellingPrice { .. })
        ));
        assert!(matches!(
            validate_pricing(-1, 1000),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_amounts_are_capped() {
        assert!(validate_price_cents("unit price", MAX_AMOUNT_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("unit price", MAX_AMOUNT_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_amount_cents("amount", i64::MAX).is_err());
        assert!(matches!(
            validate_pricing(0, i64::MAX),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(validate_split_part("cash", -1).is_err());
    }

    #[test]
    fn test_validate_sale_size() {
        assert!(matches!(validate_sale_size(0), Err(CoreError::EmptySale)));
        assert!(validate_sale_size(3).is_ok());
        assert!(validate_sale_size(MAX_SALE_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 1);
        let d2 = NaiveDate::from_ymd_opt(2026, 2, 1);
        assert!(validate_date_range(d1, d2).is_ok());
        assert!(validate_date_range(d1, None).is_ok());
        assert!(validate_date_range(d2, d1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
