//! # Write Models
//!
//! Payloads for every mutation the shop supports, each with a `validate`
//! method that applies the rules from [`crate::validation`] and
//! [`crate::payment`].
//!
//! ```text
//!   JSON body ──serde──► NewSale ──validate()──► SaleRepository::create
//!                                    │                  │
//!                          field rules, split     stock check + insert
//!                          shape (no I/O)         (one transaction)
//! ```
//!
//! Rules that need the database (stock on hand, outstanding balances) are
//! enforced by the repositories inside their transactions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::payment::{PaymentSplit, PaymentStatus};
use crate::types::{CapitalKind, Product, Role};
use crate::validation::{
    validate_amount_cents, validate_category, validate_date_range, validate_email, validate_note,
    validate_password, validate_person_name, validate_phone, validate_price_cents,
    validate_pricing, validate_product_name, validate_quantity, validate_sale_size,
    validate_search_query, validate_threshold, validate_uuid, ValidationResult,
};
use crate::DEFAULT_LOW_STOCK_THRESHOLD;

// =============================================================================
// Products
// =============================================================================

/// A new product, optionally with its first acquisition batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub initial_stock: Option<NewBatch>,
}

impl NewProduct {
    pub fn validate(&self) -> CoreResult<()> {
        validate_product_name(&self.name)?;
        validate_category(&self.category)?;
        validate_pricing(self.cost_price_cents, self.selling_price_cents)?;
        if let Some(threshold) = self.low_stock_threshold {
            validate_threshold(threshold)?;
        }
        if let Some(batch) = &self.initial_stock {
            batch.validate(self.cost_price_cents, self.selling_price_cents)?;
        }
        Ok(())
    }

    pub fn threshold(&self) -> i64 {
        self.low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
    }
}

/// Partial product update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cost_price_cents: Option<i64>,
    #[serde(default)]
    pub selling_price_cents: Option<i64>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

impl ProductUpdate {
    /// Returns the product with the update applied, after checking the
    /// merged result (so raising cost alone cannot pass selling price).
    pub fn apply_to(&self, product: &Product) -> CoreResult<Product> {
        let mut updated = product.clone();

        if let Some(name) = &self.name {
            validate_product_name(name)?;
            updated.name = name.trim().to_string();
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
            updated.category = category.trim().to_string();
        }
        if let Some(cost) = self.cost_price_cents {
            updated.cost_price_cents = cost;
        }
        if let Some(selling) = self.selling_price_cents {
            updated.selling_price_cents = selling;
        }
        if let Some(threshold) = self.low_stock_threshold {
            validate_threshold(threshold)?;
            updated.low_stock_threshold = threshold;
        }

        validate_pricing(updated.cost_price_cents, updated.selling_price_cents)?;
        Ok(updated)
    }
}

/// A restock: units bought from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewBatch {
    /// Defaults to today.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub quantity: i64,
    /// Unit cost. Defaults to the product's current cost price.
    #[serde(default)]
    pub cost_price_cents: Option<i64>,
    #[serde(default)]
    pub supplier: Option<String>,
    /// Omitted means paid in full in cash.
    #[serde(default)]
    pub payment: Option<PaymentSplit>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewBatch {
    /// Unit cost for this batch given the product's current cost.
    pub fn unit_cost(&self, current_cost_cents: i64) -> i64 {
        self.cost_price_cents.unwrap_or(current_cost_cents)
    }

    /// Total owed for the batch.
    pub fn total(&self, current_cost_cents: i64) -> Money {
        Money::from_cents(self.unit_cost(current_cost_cents)).multiply_quantity(self.quantity)
    }

    /// The split, defaulting to all cash.
    pub fn split(&self, current_cost_cents: i64) -> PaymentSplit {
        self.payment
            .unwrap_or_else(|| PaymentSplit::all_cash(self.total(current_cost_cents)))
    }

    /// Checks the batch against the product's current prices.
    ///
    /// ## Rules
    /// - Quantity in 1..=MAX_ITEM_QUANTITY
    /// - Unit cost not above the selling price
    /// - Split reconciles with quantity × unit cost
    pub fn validate(&self, current_cost_cents: i64, selling_price_cents: i64) -> CoreResult<()> {
        validate_quantity(self.quantity)?;
        validate_pricing(self.unit_cost(current_cost_cents), selling_price_cents)?;
        validate_note("supplier", self.supplier.as_deref())?;
        validate_note("note", self.note.as_deref())?;
        self.split(current_cost_cents)
            .reconcile(self.total(current_cost_cents))
    }
}

/// Units moved out of sellable stock (damaged or testers).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WriteOff {
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

impl WriteOff {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_quantity(self.quantity)?;
        validate_note("note", self.note.as_deref())
    }
}

/// What a write-off is recorded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOffKind {
    Damaged,
    Tester,
}

impl WriteOffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOffKind::Damaged => "damaged",
            WriteOffKind::Tester => "tester",
        }
    }
}

/// Query filters for the product list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    /// Only products at or below their low-stock threshold.
    #[serde(default)]
    pub low_stock: bool,
}

impl ProductFilter {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(search) = &self.search {
            validate_search_query(search)?;
        }
        Ok(())
    }
}

// =============================================================================
// Sales
// =============================================================================

/// One requested line of a new sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    /// Overrides the product's selling price (discounts). Defaults to it.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

/// A new sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<NewSaleItem>,
    pub payment: PaymentSplit,
}

impl NewSale {
    /// Shape checks only; the split is reconciled once unit prices are
    /// resolved against the products.
    pub fn validate(&self) -> CoreResult<()> {
        validate_sale_size(self.items.len())?;
        for item in &self.items {
            validate_uuid(&item.product_id)?;
            validate_quantity(item.quantity)?;
            if let Some(price) = item.unit_price_cents {
                validate_price_cents("unit price", price)?;
            }
        }
        if let Some(name) = self.customer_name.as_deref().filter(|n| !n.trim().is_empty()) {
            validate_person_name(name)?;
        }
        validate_phone(self.customer_phone.as_deref())?;

        // A customer owing money must be identifiable.
        if self.payment.due_cents > 0
            && self
                .customer_name
                .as_deref()
                .map_or(true, |n| n.trim().is_empty())
        {
            return Err(crate::ValidationError::Required {
                field: "customer name (sale has a due amount)".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Flag / unflag a sale for review.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleFlag {
    pub flagged: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl SaleFlag {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_note("comment", self.comment.as_deref())
    }
}

/// Query filters for the sales list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub flagged: Option<bool>,
}

impl SaleFilter {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_date_range(self.from, self.to)
    }
}

// =============================================================================
// Expenses
// =============================================================================

/// A manually recorded expense.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewExpense {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount_cents: i64,
    /// Omitted means paid in full in cash.
    #[serde(default)]
    pub payment: Option<PaymentSplit>,
    /// Who is owed when part of the expense is due. Defaults to the category.
    #[serde(default)]
    pub payee: Option<String>,
}

impl NewExpense {
    pub fn split(&self) -> PaymentSplit {
        self.payment
            .unwrap_or_else(|| PaymentSplit::all_cash(Money::from_cents(self.amount_cents)))
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_category(&self.category)?;
        validate_note("description", self.description.as_deref())?;
        validate_note("payee", self.payee.as_deref())?;
        validate_amount_cents("amount", self.amount_cents)?;
        self.split().reconcile(Money::from_cents(self.amount_cents))
    }
}

/// Query filters for the expense list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseFilter {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<String>,
}

impl ExpenseFilter {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_date_range(self.from, self.to)
    }
}

// =============================================================================
// Capital
// =============================================================================

/// An owner investment or withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCapitalEntry {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub kind: CapitalKind,
    pub amount_cents: i64,
    /// Omitted means all cash. Must not carry a due part.
    #[serde(default)]
    pub payment: Option<PaymentSplit>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewCapitalEntry {
    pub fn split(&self) -> PaymentSplit {
        self.payment
            .unwrap_or_else(|| PaymentSplit::all_cash(Money::from_cents(self.amount_cents)))
    }

    pub fn validate(&self) -> CoreResult<()> {
        validate_amount_cents("amount", self.amount_cents)?;
        validate_note("note", self.note.as_deref())?;

        let split = self.split();
        if split.due_cents != 0 {
            return Err(CoreError::CapitalWithDue);
        }
        split.reconcile(Money::from_cents(self.amount_cents))
    }
}

// =============================================================================
// Users
// =============================================================================

/// A new login.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_person_name(&self.name)?;
        validate_email(&self.email)?;
        validate_phone(self.phone.as_deref())?;
        validate_password(&self.password)
    }
}

/// Partial user update. A present `password` is re-hashed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_person_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        validate_phone(self.phone.as_deref())?;
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

// =============================================================================
// Reports & Logs
// =============================================================================

/// An optional inclusive date window.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_date_range(self.from, self.to)
    }
}

/// Query filters for the activity log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    /// Substring of the action text.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl LogFilter {
    /// Default and maximum page size.
    pub const DEFAULT_LIMIT: i64 = 200;
    pub const MAX_LIMIT: i64 = 1000;

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(search) = &self.search {
            validate_search_query(search)?;
        }
        validate_date_range(self.from, self.to)
    }

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
