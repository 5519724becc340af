//! # Domain Types
//!
//! Core records used throughout Haze Ledger.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐      │
//! │  │    Product      │◄──│ AcquisitionBatch │   │    Expense      │      │
//! │  │  cost / selling │   │  qty, supplier   │   │  amount, split  │      │
//! │  │  damaged/tester │   │  split           │   │  system flag    │      │
//! │  └────────▲────────┘   └──────────────────┘   └─────────────────┘      │
//! │           │                                                             │
//! │  ┌────────┴────────┐   ┌─────────────────┐    ┌─────────────────┐      │
//! │  │    SaleItem     │──►│      Sale       │    │    Payable      │      │
//! │  │  qty, snapshot  │   │  customer,split │    │  restock/expense│      │
//! │  └─────────────────┘   └─────────────────┘    └─────────────────┘      │
//! │                                                                         │
//! │  CapitalEntry • LogEntry • ManagedUser                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is never a field: see [`crate::stock`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::payment::{PaymentSplit, PaymentStatus};
use crate::stock::StockLevel;

// =============================================================================
// Product
// =============================================================================

/// A product the shop stocks and sells.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Current unit cost; new batches update it.
    pub cost_price_cents: i64,
    /// Current unit selling price.
    pub selling_price_cents: i64,
    /// Units written off as damaged.
    pub damaged_quantity: i64,
    /// Units opened as testers / samples.
    pub tester_quantity: i64,
    pub low_stock_threshold: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Per-unit margin at current prices.
    #[inline]
    pub fn unit_margin(&self) -> Money {
        self.selling_price() - self.cost_price()
    }
}

/// A product together with its derived stock, as listings show it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub stock: StockLevel,
    /// `stock.available()`, denormalized for clients.
    pub current_stock: i64,
    pub low_stock: bool,
    /// current_stock × cost price.
    pub stock_value_cents: i64,
}

impl ProductWithStock {
    pub fn new(product: Product, stock: StockLevel) -> Self {
        let current_stock = stock.available();
        ProductWithStock {
            low_stock: stock.is_low(product.low_stock_threshold),
            stock_value_cents: product.cost_price().multiply_quantity(current_stock).cents(),
            current_stock,
            stock,
            product,
        }
    }
}

// =============================================================================
// Acquisition Batch
// =============================================================================

/// A restock event: units bought from a supplier at a unit cost.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AcquisitionBatch {
    pub id: String,
    pub product_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub quantity: i64,
    /// Unit cost for this batch.
    pub cost_price_cents: i64,
    pub supplier: Option<String>,
    pub cash_cents: i64,
    pub digital_cents: i64,
    pub due_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl AcquisitionBatch {
    /// quantity × unit cost.
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.cost_price_cents).multiply_quantity(self.quantity)
    }

    pub fn payment(&self) -> PaymentSplit {
        PaymentSplit::new(self.cash_cents, self.digital_cents, self.due_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale. Status is derived from the due amount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub total_cents: i64,
    pub cash_cents: i64,
    pub digital_cents: i64,
    pub due_cents: i64,
    /// Marked for review by staff or admin.
    pub flagged: bool,
    pub flag_comment: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn payment(&self) -> PaymentSplit {
        PaymentSplit::new(self.cash_cents, self.digital_cents, self.due_cents)
    }

    pub fn status(&self) -> PaymentStatus {
        self.payment().status(self.total())
    }
}

/// A line item in a sale.
///
/// Name and unit price are frozen at the time of sale so that later price
/// edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A customer payment received after the sale, against its due amount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub sale_id: String,
    pub cash_cents: i64,
    pub digital_cents: i64,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sale with its derived status, line items and later payments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub status: PaymentStatus,
    pub items: Vec<SaleItem>,
    pub payments: Vec<SalePayment>,
}

impl SaleDetail {
    pub fn new(sale: Sale, items: Vec<SaleItem>, payments: Vec<SalePayment>) -> Self {
        SaleDetail {
            status: sale.status(),
            sale,
            items,
            payments,
        }
    }
}

// =============================================================================
// Expense
// =============================================================================

/// Category used for expenses created when stock is written off.
pub const WRITE_OFF_CATEGORY: &str = "Inventory Write-off";

/// Money spent running the shop.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Expense {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub category: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub cash_cents: i64,
    pub digital_cents: i64,
    pub due_cents: i64,
    /// Created automatically when testers or damaged units consume stock.
    /// These carry no cash movement: the units were paid for at restock.
    pub system_generated: bool,
    pub product_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    pub fn payment(&self) -> PaymentSplit {
        PaymentSplit::new(self.cash_cents, self.digital_cents, self.due_cents)
    }
}

// =============================================================================
// Payable
// =============================================================================

/// What created a payable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PayableSource {
    /// Unpaid part of an acquisition batch.
    Restock,
    /// Unpaid part of an expense.
    Expense,
}

/// Money the shop owes a supplier or vendor.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payable {
    pub id: String,
    pub source: PayableSource,
    /// Batch or expense ID.
    pub source_id: String,
    /// Supplier or expense category.
    pub party: String,
    /// Original amount owed.
    pub amount_cents: i64,
    pub paid_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Payable {
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.amount_cents - self.paid_cents)
    }

    pub fn is_settled(&self) -> bool {
        self.paid_cents >= self.amount_cents
    }
}

/// A payment made against a payable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayableSettlement {
    pub id: String,
    pub payable_id: String,
    pub cash_cents: i64,
    pub digital_cents: i64,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Capital
// =============================================================================

/// Direction of an owner capital movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CapitalKind {
    /// Owner puts money into the business.
    Investment,
    /// Owner takes money out.
    Withdrawal,
}

/// Owner money put into or taken out of the business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CapitalEntry {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: CapitalKind,
    pub amount_cents: i64,
    pub cash_cents: i64,
    pub digital_cents: i64,
    pub note: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CapitalEntry {
    /// Amount with its sign: investments positive, withdrawals negative.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            CapitalKind::Investment => Money::from_cents(self.amount_cents),
            CapitalKind::Withdrawal => -Money::from_cents(self.amount_cents),
        }
    }
}

// =============================================================================
// Activity Log
// =============================================================================

/// One line of the append-only activity trail.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LogEntry {
    pub id: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    /// Name of the user who did it, or "system".
    pub actor: String,
    pub action: String,
}

// =============================================================================
// Users
// =============================================================================

/// Access level of a managed user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    /// Full access: users, capital, accounts, deletions.
    Admin,
    /// Day-to-day selling and expense entry.
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A person who can log in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ManagedUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(total: i64, cash: i64, digital: i64, due: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s1".to_string(),
            date: now.date_naive(),
            customer_name: Some("Walk-in".to_string()),
            customer_phone: None,
            total_cents: total,
            cash_cents: cash,
            digital_cents: digital,
            due_cents: due,
            flagged: false,
            flag_comment: None,
            created_by: "staff".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sale_status_is_derived() {
        assert_eq!(sale(1000, 1000, 0, 0).status(), PaymentStatus::Paid);
        assert_eq!(sale(1000, 500, 0, 500).status(), PaymentStatus::Partial);
        assert_eq!(sale(1000, 0, 0, 1000).status(), PaymentStatus::Due);
    }

    #[test]
    fn test_payable_remaining() {
        let now = Utc::now();
        let payable = Payable {
            id: "p".to_string(),
            source: PayableSource::Restock,
            source_id: "b".to_string(),
            party: "Cloud Nine Supply".to_string(),
            amount_cents: 5000,
            paid_cents: 1500,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(payable.remaining().cents(), 3500);
        assert!(!payable.is_settled());
    }

    #[test]
    fn test_capital_signed_amount() {
        let entry = CapitalEntry {
            id: "c".to_string(),
            date: Utc::now().date_naive(),
            kind: CapitalKind::Withdrawal,
            amount_cents: 2000,
            cash_cents: 2000,
            digital_cents: 0,
            note: None,
            created_by: "owner".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(entry.signed_amount().cents(), -2000);
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let now = Utc::now();
        let user = ManagedUser {
            id: "u".to_string(),
            name: "Rafi".to_string(),
            email: "rafi@example.com".to_string(),
            phone: None,
            role: Role::Staff,
            password_hash: "$argon2id$secret".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"staff\""));
    }

    #[test]
    fn test_product_with_stock() {
        let now = Utc::now();
        let product = Product {
            id: "p".to_string(),
            name: "Disposable 5000".to_string(),
            category: "Disposables".to_string(),
            cost_price_cents: 600,
            selling_price_cents: 1100,
            damaged_quantity: 1,
            tester_quantity: 1,
            low_stock_threshold: 5,
            created_at: now,
            updated_at: now,
        };
        let view = ProductWithStock::new(product, StockLevel::new(20, 14, 1, 1));
        assert_eq!(view.current_stock, 4);
        assert!(view.low_stock);
        assert_eq!(view.stock_value_cents, 2400);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Disposable 5000");
        assert_eq!(json["currentStock"], 4);
    }

    #[test]
    fn test_batch_total_cost() {
        let batch = AcquisitionBatch {
            id: "b".to_string(),
            product_id: "p".to_string(),
            date: Utc::now().date_naive(),
            quantity: 12,
            cost_price_cents: 650,
            supplier: Some("Vapor Wholesale".to_string()),
            cash_cents: 7800,
            digital_cents: 0,
            due_cents: 0,
            note: None,
            created_at: Utc::now(),
        };
        assert_eq!(batch.total_cost().cents(), 7800);
        assert!(batch.payment().reconcile(batch.total_cost()).is_ok());
    }
}
