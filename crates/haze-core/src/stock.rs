//! # Stock Derivation
//!
//! Sellable stock is never stored. It is derived on every read:
//!
//! ```text
//!   available = Σ batch quantities      (acquired)
//!             − Σ sold quantities       (all sale items for the product)
//!             − damaged_quantity
//!             − tester_quantity
//! ```
//!
//! The database layer aggregates the four inputs with SQL and hands them to
//! [`StockLevel`]; the subtraction itself lives only here.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{AcquisitionBatch, Product, SaleItem};

/// Derives sellable stock from its four inputs.
///
/// ```rust
/// use haze_core::stock::derive_stock;
///
/// assert_eq!(derive_stock(40, 25, 2, 3), 10);
/// ```
#[inline]
pub const fn derive_stock(acquired: i64, sold: i64, damaged: i64, tester: i64) -> i64 {
    acquired - sold - damaged - tester
}

/// Breakdown of a product's stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockLevel {
    pub acquired: i64,
    pub sold: i64,
    pub damaged: i64,
    pub tester: i64,
}

impl StockLevel {
    pub const fn new(acquired: i64, sold: i64, damaged: i64, tester: i64) -> Self {
        StockLevel {
            acquired,
            sold,
            damaged,
            tester,
        }
    }

    /// Computes the level by scanning a product's batches and the full list
    /// of sale items. Items for other products are ignored.
    pub fn scan(product: &Product, batches: &[AcquisitionBatch], items: &[SaleItem]) -> Self {
        let acquired = batches
            .iter()
            .filter(|b| b.product_id == product.id)
            .map(|b| b.quantity)
            .sum();
        let sold = items
            .iter()
            .filter(|i| i.product_id == product.id)
            .map(|i| i.quantity)
            .sum();

        StockLevel::new(
            acquired,
            sold,
            product.damaged_quantity,
            product.tester_quantity,
        )
    }

    /// Units that can still be sold.
    #[inline]
    pub const fn available(&self) -> i64 {
        derive_stock(self.acquired, self.sold, self.damaged, self.tester)
    }

    #[inline]
    pub const fn can_consume(&self, qty: i64) -> bool {
        qty <= self.available()
    }

    /// At or below the low-stock threshold.
    #[inline]
    pub const fn is_low(&self, threshold: i64) -> bool {
        self.available() <= threshold
    }

    /// Fails with [`CoreError::InsufficientStock`] when `qty` units are not
    /// on hand.
    pub fn ensure_available(&self, product: &str, qty: i64) -> CoreResult<()> {
        if self.can_consume(qty) {
            Ok(())
        } else {
            Err(CoreError::InsufficientStock {
                product: product.to_string(),
                available: self.available(),
                requested: qty,
            })
        }
    }
}
