//! # Payment Split
//!
//! Every money movement in the shop is recorded as a three-way split:
//! what was paid in cash, what was paid digitally (card, mobile wallet,
//! bank transfer) and what is still due.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who uses the split                                   │
//! │                                                                         │
//! │  Sale             total = Σ line totals     due → receivable           │
//! │  Restock batch    total = qty × unit cost   due → payable              │
//! │  Expense          total = amount            due → payable              │
//! │  Capital entry    total = amount            due must be 0              │
//! │                                                                         │
//! │  Settling a receivable / payable moves part of `due`                   │
//! │  into `cash` and `digital` via a [`Settlement`].                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All of these go through [`PaymentSplit::reconcile`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{amount_out_of_range, validate_split_part};
use crate::SPLIT_TOLERANCE_CENTS;

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement state derived from the due part of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentStatus {
    /// Nothing due.
    Paid,
    /// Some money received, some still due.
    Partial,
    /// Nothing received yet.
    Due,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Due => "due",
        }
    }
}

// =============================================================================
// Payment Split
// =============================================================================

/// Cash / digital / due breakdown of a total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentSplit {
    #[serde(default)]
    pub cash_cents: i64,
    #[serde(default)]
    pub digital_cents: i64,
    #[serde(default)]
    pub due_cents: i64,
}

impl PaymentSplit {
    pub const fn new(cash_cents: i64, digital_cents: i64, due_cents: i64) -> Self {
        PaymentSplit {
            cash_cents,
            digital_cents,
            due_cents,
        }
    }

    /// A split where the whole total is paid in cash.
    pub const fn all_cash(total: Money) -> Self {
        PaymentSplit::new(total.cents(), 0, 0)
    }

    pub fn cash(&self) -> Money {
        Money::from_cents(self.cash_cents)
    }

    pub fn digital(&self) -> Money {
        Money::from_cents(self.digital_cents)
    }

    pub fn due(&self) -> Money {
        Money::from_cents(self.due_cents)
    }

    /// Money actually received (cash + digital).
    pub fn paid(&self) -> Money {
        self.cash() + self.digital()
    }

    /// Sum of all three parts.
    pub fn allocated(&self) -> Money {
        self.paid() + self.due()
    }

    /// Checks the split against a total.
    ///
    /// ## Rules
    /// - Every part lies in `0..=MAX_AMOUNT_CENTS`
    /// - `cash + digital + due` equals `total` within [`SPLIT_TOLERANCE_CENTS`]
    ///
    /// ```rust
    /// use haze_core::{Money, PaymentSplit};
    ///
    /// let split = PaymentSplit::new(600, 300, 100);
    /// assert!(split.reconcile(Money::from_cents(1000)).is_ok());
    /// assert!(split.reconcile(Money::from_cents(1200)).is_err());
    /// ```
    pub fn reconcile(&self, total: Money) -> CoreResult<()> {
        validate_split_part("cash", self.cash_cents)?;
        validate_split_part("digital", self.digital_cents)?;
        validate_split_part("due", self.due_cents)?;

        let allocated = Money::checked_sum([self.cash(), self.digital(), self.due()])
            .ok_or_else(|| amount_out_of_range("payment split"))?;
        let difference = allocated
            .cents()
            .checked_sub(total.cents())
            .and_then(i64::checked_abs)
            .ok_or_else(|| amount_out_of_range("payment split"))?;
        if difference > SPLIT_TOLERANCE_CENTS {
            return Err(CoreError::SplitMismatch { total, allocated });
        }

        Ok(())
    }

    /// Derives the settlement status for a given total.
    pub fn status(&self, total: Money) -> PaymentStatus {
        if self.due_cents <= 0 {
            PaymentStatus::Paid
        } else if self.due_cents >= total.cents() {
            PaymentStatus::Due
        } else {
            PaymentStatus::Partial
        }
    }

    /// Returns the split after applying a settlement: the settled amount
    /// leaves `due` and lands in `cash` / `digital`.
    ///
    /// The settlement must already have been checked with
    /// [`Settlement::validate_against`].
    pub fn apply(&self, settlement: &Settlement) -> PaymentSplit {
        PaymentSplit {
            cash_cents: self.cash_cents + settlement.cash_cents,
            digital_cents: self.digital_cents + settlement.digital_cents,
            due_cents: self.due_cents - settlement.total().cents(),
        }
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// A payment against an outstanding due (receivable or payable).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Settlement {
    #[serde(default)]
    pub cash_cents: i64,
    #[serde(default)]
    pub digital_cents: i64,
}

impl Settlement {
    pub const fn new(cash_cents: i64, digital_cents: i64) -> Self {
        Settlement {
            cash_cents,
            digital_cents,
        }
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.cash_cents + self.digital_cents)
    }

    /// Checks the settlement against what is still owed.
    ///
    /// ## Rules
    /// - Each part lies in `0..=MAX_AMOUNT_CENTS`
    /// - The total must be positive
    /// - The total must not exceed `outstanding`
    pub fn validate_against(&self, outstanding: Money) -> CoreResult<Money> {
        validate_split_part("cash", self.cash_cents)?;
        validate_split_part("digital", self.digital_cents)?;

        let offered = self.total();
        if !offered.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            }
            .into());
        }
        if offered > outstanding {
            return Err(CoreError::Overpayment {
                outstanding,
                offered,
            });
        }

        Ok(offered)
    }
}
