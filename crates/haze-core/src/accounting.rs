//! # Accounting
//!
//! Folds raw ledger aggregates into the owner's financial summary.
//!
//! ```text
//!   revenue          ─┐
//!   − COGS            ├─► gross profit ─┐
//!                    ─┘                 │
//!   − expenses (manual)                 ├─► net profit
//!   − write-offs (testers / damage)    ─┘
//!
//!   cash    = capital + sales − restock − expenses − payable settlements
//!   digital = same, digital side
//! ```
//!
//! The database layer computes each aggregate with SQL and fills a
//! [`LedgerTotals`]; everything below is plain arithmetic.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// A cash / digital pair of sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Flow {
    pub cash: Money,
    pub digital: Money,
}

impl Flow {
    pub const fn new(cash_cents: i64, digital_cents: i64) -> Self {
        Flow {
            cash: Money::from_cents(cash_cents),
            digital: Money::from_cents(digital_cents),
        }
    }

    pub fn total(&self) -> Money {
        self.cash + self.digital
    }
}

/// Raw aggregates the summary is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Σ sale totals.
    pub revenue: Money,
    /// Σ sold quantity × current product cost.
    pub cost_of_goods_sold: Money,
    /// Σ manual expense amounts.
    pub expenses: Money,
    /// Σ system-generated write-off amounts.
    pub write_offs: Money,
    /// Σ outstanding sale dues.
    pub receivables: Money,
    /// Σ remaining payable balances.
    pub payables: Money,
    /// Investments minus withdrawals, per channel.
    pub capital: Flow,
    /// Money received at the till when sales were made.
    pub sales: Flow,
    /// Money received later against sale dues, by payment date.
    pub receivable_payments: Flow,
    /// Money paid out for acquisition batches.
    pub restock: Flow,
    /// Money paid out for manual expenses.
    pub expense_payments: Flow,
    /// Money paid against payables.
    pub payable_settlements: Flow,
    /// Σ available stock × cost price.
    pub inventory_value: Money,
}

/// The owner-facing financial summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FinancialSummary {
    pub revenue: Money,
    pub cost_of_goods_sold: Money,
    pub gross_profit: Money,
    pub expenses: Money,
    pub write_offs: Money,
    pub net_profit: Money,
    pub receivables: Money,
    pub payables: Money,
    pub cash_balance: Money,
    pub digital_balance: Money,
    pub inventory_value: Money,
}

impl FinancialSummary {
    /// Computes the summary.
    ///
    /// ```rust
    /// use haze_core::accounting::{FinancialSummary, Flow, LedgerTotals};
    /// use haze_core::Money;
    ///
    /// let totals = LedgerTotals {
    ///     revenue: Money::from_cents(10_000),
    ///     cost_of_goods_sold: Money::from_cents(6_000),
    ///     expenses: Money::from_cents(1_000),
    ///     write_offs: Money::from_cents(500),
    ///     ..LedgerTotals::default()
    /// };
    /// let summary = FinancialSummary::from_totals(&totals);
    /// assert_eq!(summary.gross_profit.cents(), 4_000);
    /// assert_eq!(summary.net_profit.cents(), 2_500);
    /// ```
    pub fn from_totals(t: &LedgerTotals) -> Self {
        let gross_profit = t.revenue - t.cost_of_goods_sold;
        let net_profit = gross_profit - t.expenses - t.write_offs;

        let out_cash = t.restock.cash + t.expense_payments.cash + t.payable_settlements.cash;
        let out_digital =
            t.restock.digital + t.expense_payments.digital + t.payable_settlements.digital;
        let in_cash = t.capital.cash + t.sales.cash + t.receivable_payments.cash;
        let in_digital = t.capital.digital + t.sales.digital + t.receivable_payments.digital;
        let cash_balance = in_cash - out_cash;
        let digital_balance = in_digital - out_digital;

        FinancialSummary {
            revenue: t.revenue,
            cost_of_goods_sold: t.cost_of_goods_sold,
            gross_profit,
            expenses: t.expenses,
            write_offs: t.write_offs,
            net_profit,
            receivables: t.receivables,
            payables: t.payables,
            cash_balance,
            digital_balance,
            inventory_value: t.inventory_value,
        }
    }

    /// Cash plus digital.
    pub fn liquid_balance(&self) -> Money {
        self.cash_balance + self.digital_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_chain() {
        let totals = LedgerTotals {
            revenue: Money::from_cents(50_000),
            cost_of_goods_sold: Money::from_cents(30_000),
            expenses: Money::from_cents(8_000),
            write_offs: Money::from_cents(2_000),
            ..LedgerTotals::default()
        };
        let s = FinancialSummary::from_totals(&totals);

        assert_eq!(s.gross_profit.cents(), 20_000);
        assert_eq!(s.net_profit.cents(), 10_000);
    }

    #[test]
    fn test_net_loss_goes_negative() {
        let totals = LedgerTotals {
            revenue: Money::from_cents(1_000),
            cost_of_goods_sold: Money::from_cents(800),
            expenses: Money::from_cents(5_000),
            ..LedgerTotals::default()
        };
        let s = FinancialSummary::from_totals(&totals);
        assert_eq!(s.net_profit.cents(), -4_800);
    }

    #[test]
    fn test_balances_per_channel() {
        let totals = LedgerTotals {
            capital: Flow::new(100_000, 50_000),
            sales: Flow::new(20_000, 10_000),
            receivable_payments: Flow::new(3_000, 500),
            restock: Flow::new(40_000, 30_000),
            expense_payments: Flow::new(5_000, 0),
            payable_settlements: Flow::new(1_000, 2_000),
            ..LedgerTotals::default()
        };
        let s = FinancialSummary::from_totals(&totals);

        assert_eq!(
            s.cash_balance.cents(),
            100_000 + 20_000 + 3_000 - 40_000 - 5_000 - 1_000
        );
        assert_eq!(s.digital_balance.cents(), 50_000 + 10_000 + 500 - 30_000 - 2_000);
        assert_eq!(s.liquid_balance().cents(), 77_000 + 28_500);
    }

    #[test]
    fn test_passthrough_fields() {
        let totals = LedgerTotals {
            receivables: Money::from_cents(700),
            payables: Money::from_cents(900),
            inventory_value: Money::from_cents(12_345),
            ..LedgerTotals::default()
        };
        let s = FinancialSummary::from_totals(&totals);
        assert_eq!(s.receivables.cents(), 700);
        assert_eq!(s.payables.cents(), 900);
        assert_eq!(s.inventory_value.cents(), 12_345);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let s = FinancialSummary::from_totals(&LedgerTotals::default());
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["costOfGoodsSold"], 0);
        assert_eq!(json["cashBalance"], 0);
    }
}
