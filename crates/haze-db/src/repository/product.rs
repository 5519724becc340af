//! # Product Repository
//!
//! Database operations for the product catalogue.
//!
//! ## Key Operations
//! - Listing with derived stock (category / search / low-stock filters)
//! - CRUD, with deletion refused once a product has been sold
//! - Restocking: acquisition batch + payable for any due part
//! - Write-offs: damaged units and testers, each booked as a
//!   system-generated expense at cost
//!
//! ## Write-off Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/products/{id}/testers  { quantity: 2 }                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │   ├── SELECT product                       (404 if missing)            │
//! │   ├── stock::level_in()  available ≥ 2 ?   (400 if not, nothing written)│
//! │   ├── UPDATE products SET tester_quantity = tester_quantity + 2        │
//! │   ├── INSERT expenses  (system_generated, 2 × cost, split 0/0/0)       │
//! │   └── INSERT activity_logs                                             │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use haze_core::input::{NewBatch, NewProduct, ProductFilter, ProductUpdate, WriteOff, WriteOffKind};
use haze_core::{
    AcquisitionBatch, CoreError, Expense, Money, PayableSource, Product, ProductWithStock,
    WRITE_OFF_CATEGORY,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::stock::{level_in, ProductStockRow, PRODUCT_STOCK_SELECT};
use crate::repository::{clean, contains_pattern, expense, generate_id, log, payable, today};

const PRODUCT_COLUMNS: &str = r#"
    id, name, category, cost_price_cents, selling_price_cents,
    damaged_quantity, tester_quantity, low_stock_threshold,
    created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let low = repo.list(&ProductFilter { low_stock: true, ..Default::default() }).await?;
/// let batch = repo.restock(&id, &new_batch, "Nadia").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists products with their derived stock, ordered by name.
    ///
    /// ## Filters
    /// - `category`: exact match, case-insensitive
    /// - `search`: substring of name or category
    /// - `low_stock`: only products at or below their threshold
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<ProductWithStock>> {
        let category = clean(filter.category.as_deref());
        let search = clean(filter.search.as_deref());
        let pattern = search.as_deref().map(contains_pattern);

        debug!(category = ?category, search = ?search, low_stock = filter.low_stock, "Listing products");

        let sql = format!(
            r#"{PRODUCT_STOCK_SELECT}
            WHERE (?1 IS NULL OR p.category = ?1 COLLATE NOCASE)
              AND (?2 IS NULL OR p.name LIKE ?2 ESCAPE '\' OR p.category LIKE ?2 ESCAPE '\')
            ORDER BY p.name COLLATE NOCASE
            "#
        );

        let rows = sqlx::query_as::<_, ProductStockRow>(&sql)
            .bind(category)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        let products: Vec<ProductWithStock> = rows
            .into_iter()
            .map(|row| {
                let level = row.level();
                ProductWithStock::new(row.product, level)
            })
            .filter(|p| !filter.low_stock || p.low_stock)
            .collect();

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, id).await
    }

    /// Gets a product with its derived stock.
    pub async fn get_with_stock(&self, id: &str) -> DbResult<Option<ProductWithStock>> {
        let sql = format!("{PRODUCT_STOCK_SELECT} WHERE p.id = ?1");

        let row = sqlx::query_as::<_, ProductStockRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            let level = row.level();
            ProductWithStock::new(row.product, level)
        }))
    }

    /// Acquisition batches of a product, newest first.
    pub async fn batches(&self, product_id: &str) -> DbResult<Vec<AcquisitionBatch>> {
        let batches = sqlx::query_as::<_, AcquisitionBatch>(
            r#"
            SELECT id, product_id, date, quantity, cost_price_cents, supplier,
                   cash_cents, digital_cents, due_cents, note, created_at
            FROM acquisition_batches
            WHERE product_id = ?1
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Distinct categories in use, alphabetically.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products ORDER BY category COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a product, with its first batch if `initial_stock` is given.
    pub async fn create(&self, new: &NewProduct, actor: &str) -> DbResult<ProductWithStock> {
        new.validate()?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name: new.name.trim().to_string(),
            category: new.category.trim().to_string(),
            cost_price_cents: new.cost_price_cents,
            selling_price_cents: new.selling_price_cents,
            damaged_quantity: 0,
            tester_quantity: 0,
            low_stock_threshold: new.threshold(),
            created_at: now,
            updated_at: now,
        };

        debug!(name = %product.name, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, cost_price_cents, selling_price_cents,
                damaged_quantity, tester_quantity, low_stock_threshold,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.damaged_quantity)
        .bind(product.tester_quantity)
        .bind(product.low_stock_threshold)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut action = format!(
            "Added product {} ({}) at cost {} / price {}",
            product.name,
            product.category,
            product.cost_price(),
            product.selling_price()
        );

        if let Some(batch) = &new.initial_stock {
            let batch = insert_batch_in(&mut tx, &product, batch).await?;
            action.push_str(&format!(" with {} units in stock", batch.quantity));
        }

        log::append_in(&mut tx, actor, action).await?;
        tx.commit().await?;

        info!(id = %product.id, name = %product.name, "Product created");

        self.get_with_stock(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, update: &ProductUpdate, actor: &str) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let current = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let mut updated = update.apply_to(&current)?;
        updated.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                cost_price_cents = ?4,
                selling_price_cents = ?5,
                low_stock_threshold = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&updated.id)
        .bind(&updated.name)
        .bind(&updated.category)
        .bind(updated.cost_price_cents)
        .bind(updated.selling_price_cents)
        .bind(updated.low_stock_threshold)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        log::append_in(&mut tx, actor, describe_update(&current, &updated)).await?;
        tx.commit().await?;

        info!(id = %id, "Product updated");
        Ok(updated)
    }

    /// Deletes a product and its batches.
    ///
    /// ## Rules
    /// - Refused with [`DbError::InUse`] once any sale references it
    /// - Refused once any money has gone out for its stock, either paid on a
    ///   batch or settled against a restock payable
    /// - Untouched payables for its batches are removed with it
    pub async fn delete(&self, id: &str, actor: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;

        let product = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let sold_in: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT sale_id) FROM sale_items WHERE product_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if sold_in > 0 {
            return Err(DbError::in_use(
                "Product",
                id,
                format!("referenced by {sold_in} sale(s)"),
            ));
        }

        let paid_out: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COALESCE(SUM(cash_cents + digital_cents), 0)
                 FROM acquisition_batches WHERE product_id = ?1)
              + (SELECT COALESCE(SUM(paid_cents), 0)
                 FROM payables
                 WHERE source = 'restock'
                   AND source_id IN (SELECT id FROM acquisition_batches WHERE product_id = ?1))
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if paid_out > 0 {
            return Err(DbError::in_use(
                "Product",
                id,
                format!("{} already paid for its stock", Money::from_cents(paid_out)),
            ));
        }

        sqlx::query(
            r#"
            DELETE FROM payables
            WHERE source = 'restock'
              AND source_id IN (SELECT id FROM acquisition_batches WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        log::append_in(&mut tx, actor, format!("Deleted product {}", product.name)).await?;
        tx.commit().await?;

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Records an acquisition batch.
    ///
    /// ## What This Does
    /// 1. Validates quantity, unit cost (≤ selling price) and split
    /// 2. Inserts the batch; the product's cost price becomes the batch cost
    /// 3. Opens a payable to the supplier for any due part
    pub async fn restock(
        &self,
        product_id: &str,
        batch: &NewBatch,
        actor: &str,
    ) -> DbResult<AcquisitionBatch> {
        debug!(product_id = %product_id, quantity = batch.quantity, "Restocking product");

        let mut tx = self.pool.begin().await?;

        let product = fetch_in(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        batch.validate(product.cost_price_cents, product.selling_price_cents)?;

        let inserted = insert_batch_in(&mut tx, &product, batch).await?;

        log::append_in(
            &mut tx,
            actor,
            format!(
                "Restocked {} × {}{} for {} (cash {}, digital {}, due {})",
                inserted.quantity,
                product.name,
                inserted
                    .supplier
                    .as_deref()
                    .map(|s| format!(" from {s}"))
                    .unwrap_or_default(),
                inserted.total_cost(),
                inserted.payment().cash(),
                inserted.payment().digital(),
                inserted.payment().due(),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            batch_id = %inserted.id,
            quantity = inserted.quantity,
            "Product restocked"
        );
        Ok(inserted)
    }

    /// Moves units out of sellable stock as damaged or testers.
    ///
    /// Returns the system-generated expense that values the loss at cost.
    pub async fn write_off(
        &self,
        product_id: &str,
        kind: WriteOffKind,
        write_off: &WriteOff,
        actor: &str,
    ) -> DbResult<Expense> {
        write_off.validate()?;

        debug!(
            product_id = %product_id,
            kind = kind.as_str(),
            quantity = write_off.quantity,
            "Writing off stock"
        );

        let mut tx = self.pool.begin().await?;

        let product = fetch_in(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let level = level_in(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        level.ensure_available(&product.name, write_off.quantity)?;

        let sql = match kind {
            WriteOffKind::Damaged => {
                "UPDATE products SET damaged_quantity = damaged_quantity + ?2, updated_at = ?3 WHERE id = ?1"
            }
            WriteOffKind::Tester => {
                "UPDATE products SET tester_quantity = tester_quantity + ?2, updated_at = ?3 WHERE id = ?1"
            }
        };
        sqlx::query(sql)
            .bind(product_id)
            .bind(write_off.quantity)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        let label = match kind {
            WriteOffKind::Damaged => "damaged",
            WriteOffKind::Tester => "moved to testers",
        };
        let amount = product.cost_price().multiply_quantity(write_off.quantity);
        let description = match clean(write_off.note.as_deref()) {
            Some(note) => format!("{} × {} {label}: {note}", write_off.quantity, product.name),
            None => format!("{} × {} {label}", write_off.quantity, product.name),
        };

        let expense = Expense {
            id: generate_id(),
            date: today(),
            category: WRITE_OFF_CATEGORY.to_string(),
            description: Some(description.clone()),
            amount_cents: amount.cents(),
            cash_cents: 0,
            digital_cents: 0,
            due_cents: 0,
            system_generated: true,
            product_id: Some(product.id.clone()),
            created_by: actor.to_string(),
            created_at: Utc::now(),
        };
        expense::insert_in(&mut tx, &expense).await?;

        log::append_in(
            &mut tx,
            actor,
            format!("{description} (write-off {amount})"),
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            kind = kind.as_str(),
            quantity = write_off.quantity,
            "Stock written off"
        );
        Ok(expense)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a product on an existing connection or transaction.
pub(crate) async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

/// Inserts a validated batch, moves the product's cost price to the batch
/// cost, and opens a payable for any due part.
async fn insert_batch_in(
    conn: &mut SqliteConnection,
    product: &Product,
    new: &NewBatch,
) -> DbResult<AcquisitionBatch> {
    let split = new.split(product.cost_price_cents);
    let batch = AcquisitionBatch {
        id: generate_id(),
        product_id: product.id.clone(),
        date: new.date.unwrap_or_else(today),
        quantity: new.quantity,
        cost_price_cents: new.unit_cost(product.cost_price_cents),
        supplier: clean(new.supplier.as_deref()),
        cash_cents: split.cash_cents,
        digital_cents: split.digital_cents,
        due_cents: split.due_cents,
        note: clean(new.note.as_deref()),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO acquisition_batches (
            id, product_id, date, quantity, cost_price_cents, supplier,
            cash_cents, digital_cents, due_cents, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.product_id)
    .bind(batch.date)
    .bind(batch.quantity)
    .bind(batch.cost_price_cents)
    .bind(&batch.supplier)
    .bind(batch.cash_cents)
    .bind(batch.digital_cents)
    .bind(batch.due_cents)
    .bind(&batch.note)
    .bind(batch.created_at)
    .execute(&mut *conn)
    .await?;

    if batch.cost_price_cents != product.cost_price_cents {
        sqlx::query("UPDATE products SET cost_price_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&product.id)
            .bind(batch.cost_price_cents)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
    }

    if batch.due_cents > 0 {
        let party = batch
            .supplier
            .clone()
            .unwrap_or_else(|| format!("Supplier of {}", product.name));
        payable::open_in(
            conn,
            PayableSource::Restock,
            &batch.id,
            &party,
            Money::from_cents(batch.due_cents),
        )
        .await?;
    }

    Ok(batch)
}

fn describe_update(before: &Product, after: &Product) -> String {
    let mut changes = Vec::new();
    if before.name != after.name {
        changes.push(format!("name '{}' → '{}'", before.name, after.name));
    }
    if before.category != after.category {
        changes.push(format!("category '{}' → '{}'", before.category, after.category));
    }
    if before.cost_price_cents != after.cost_price_cents {
        changes.push(format!("cost {} → {}", before.cost_price(), after.cost_price()));
    }
    if before.selling_price_cents != after.selling_price_cents {
        changes.push(format!("price {} → {}", before.selling_price(), after.selling_price()));
    }
    if before.low_stock_threshold != after.low_stock_threshold {
        changes.push(format!(
            "low-stock threshold {} → {}",
            before.low_stock_threshold, after.low_stock_threshold
        ));
    }

    if changes.is_empty() {
        format!("Saved product {} (no changes)", after.name)
    } else {
        format!("Updated product {}: {}", after.name, changes.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{cash, db, new_product, stocked_product};
    use haze_core::input::{NewSale, NewSaleItem};
    use haze_core::{PaymentSplit, Settlement};

    fn batch(quantity: i64, cost: Option<i64>, payment: Option<PaymentSplit>) -> NewBatch {
        NewBatch {
            date: None,
            quantity,
            cost_price_cents: cost,
            supplier: Some("Cloud Nine Supply".to_string()),
            payment,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_create_with_initial_stock() {
        let db = db().await;
        let created = stocked_product(&db, "Blue Razz 30ml", 24).await;

        assert_eq!(created.current_stock, 24);
        assert_eq!(created.stock.acquired, 24);
        assert_eq!(db.products().batches(&created.product.id).await.unwrap().len(), 1);
        assert_eq!(db.logs().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_cost_above_price() {
        let db = db().await;
        let err = db
            .products()
            .create(&new_product("Bad", 1500, 1000, None), "admin")
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Rule(CoreError::CostAboveSellingPrice { .. })));
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert_eq!(db.logs().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = db().await;
        stocked_product(&db, "Mango Ice 30ml", 20).await;
        stocked_product(&db, "Mint 30ml", 2).await;
        db.products()
            .create(
                &NewProduct {
                    category: "Devices".to_string(),
                    ..new_product("Pod Kit", 1500, 2500, Some(10))
                },
                "admin",
            )
            .await
            .unwrap();

        let repo = db.products();
        assert_eq!(repo.list(&ProductFilter::default()).await.unwrap().len(), 3);

        let devices = repo
            .list(&ProductFilter {
                category: Some("devices".to_string()),
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].product.name, "Pod Kit");

        let mint = repo
            .list(&ProductFilter {
                search: Some("mint".to_string()),
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(mint.len(), 1);

        // Wildcards in the search text match only themselves
        stocked_product(&db, "Nic Salt 50% Off", 20).await;
        stocked_product(&db, "Ice_Pod", 20).await;
        for (search, expected) in [("%", "Nic Salt 50% Off"), ("_", "Ice_Pod")] {
            let found = repo
                .list(&ProductFilter {
                    search: Some(search.to_string()),
                    ..ProductFilter::default()
                })
                .await
                .unwrap();
            assert_eq!(found.len(), 1, "search {search:?}");
            assert_eq!(found[0].product.name, expected);
        }

        let low = repo
            .list(&ProductFilter {
                low_stock: true,
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product.name, "Mint 30ml");

        assert_eq!(
            repo.categories().await.unwrap(),
            vec!["Devices".to_string(), "E-Liquid".to_string()]
        );
    }

    #[tokio::test]
    async fn test_update_validates_merged_prices() {
        let db = db().await;
        let p = stocked_product(&db, "Grape 60ml", 5).await;

        let err = db
            .products()
            .update(
                &p.product.id,
                &ProductUpdate {
                    cost_price_cents: Some(2000),
                    ..ProductUpdate::default()
                },
                "admin",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::CostAboveSellingPrice { .. })));

        let updated = db
            .products()
            .update(
                &p.product.id,
                &ProductUpdate {
                    selling_price_cents: Some(1600),
                    ..ProductUpdate::default()
                },
                "admin",
            )
            .await
            .unwrap();
        assert_eq!(updated.selling_price_cents, 1600);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = db().await;
        let err = db
            .products()
            .update("missing", &ProductUpdate::default(), "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_restock_with_due_opens_payable() {
        let db = db().await;
        let p = stocked_product(&db, "Watermelon 30ml", 10).await;

        let inserted = db
            .products()
            .restock(
                &p.product.id,
                &batch(20, Some(750), Some(PaymentSplit::new(10_000, 0, 5_000))),
                "admin",
            )
            .await
            .unwrap();
        assert_eq!(inserted.total_cost().cents(), 15_000);

        let after = db.products().get_with_stock(&p.product.id).await.unwrap().unwrap();
        assert_eq!(after.current_stock, 30);
        assert_eq!(after.product.cost_price_cents, 750);

        let open = db.payables().list(true).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].amount_cents, 5_000);
        assert_eq!(open[0].party, "Cloud Nine Supply");
        assert_eq!(open[0].source_id, inserted.id);
    }

    #[tokio::test]
    async fn test_restock_split_mismatch_writes_nothing() {
        let db = db().await;
        let p = stocked_product(&db, "Lychee 30ml", 10).await;

        let err = db
            .products()
            .restock(&p.product.id, &batch(5, None, Some(cash(100))), "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::SplitMismatch { .. })));

        assert_eq!(db.products().batches(&p.product.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restock_unknown_product() {
        let db = db().await;
        let err = db
            .products()
            .restock("missing", &batch(5, None, None), "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_write_offs_reduce_stock_and_book_expense() {
        let db = db().await;
        let p = stocked_product(&db, "Peach 30ml", 10).await;
        let repo = db.products();

        let damaged = repo
            .write_off(
                &p.product.id,
                WriteOffKind::Damaged,
                &WriteOff {
                    quantity: 2,
                    note: Some("dropped".to_string()),
                },
                "Nadia",
            )
            .await
            .unwrap();
        assert!(damaged.system_generated);
        assert_eq!(damaged.amount_cents, 1600);
        assert_eq!(damaged.category, WRITE_OFF_CATEGORY);

        repo.write_off(
            &p.product.id,
            WriteOffKind::Tester,
            &WriteOff {
                quantity: 1,
                note: None,
            },
            "Nadia",
        )
        .await
        .unwrap();

        let after = repo.get_with_stock(&p.product.id).await.unwrap().unwrap();
        assert_eq!(after.stock.damaged, 2);
        assert_eq!(after.stock.tester, 1);
        assert_eq!(after.current_stock, 7);
    }

    #[tokio::test]
    async fn test_write_off_beyond_stock_is_rejected() {
        let db = db().await;
        let p = stocked_product(&db, "Cola 30ml", 3).await;

        let err = db
            .products()
            .write_off(
                &p.product.id,
                WriteOffKind::Tester,
                &WriteOff {
                    quantity: 4,
                    note: None,
                },
                "Nadia",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            })
        ));

        let after = db.products().get_with_stock(&p.product.id).await.unwrap().unwrap();
        assert_eq!(after.current_stock, 3);
        assert!(db.expenses().list(&Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_refused_after_sale() {
        let db = db().await;
        let sold = stocked_product(&db, "Sold Item", 5).await;
        let unsold = stocked_product(&db, "Unsold Item", 5).await;

        db.sales()
            .create(
                &NewSale {
                    date: None,
                    customer_name: None,
                    customer_phone: None,
                    items: vec![NewSaleItem {
                        product_id: sold.product.id.clone(),
                        quantity: 1,
                        unit_price_cents: None,
                    }],
                    payment: cash(1400),
                },
                "Rafi",
            )
            .await
            .unwrap();

        let err = db.products().delete(&sold.product.id, "admin").await.unwrap_err();
        assert!(matches!(err, DbError::InUse { .. }));

        // Opening stock was paid in cash, so that money stays on the books.
        let err = db.products().delete(&unsold.product.id, "admin").await.unwrap_err();
        assert!(matches!(err, DbError::InUse { .. }));
    }

    #[tokio::test]
    async fn test_delete_unpaid_product_removes_batches_and_payable() {
        let db = db().await;
        let p = db
            .products()
            .create(&new_product("Ordered Item", 500, 900, None), "admin")
            .await
            .unwrap();
        db.products()
            .restock(
                &p.product.id,
                &batch(4, None, Some(PaymentSplit::new(0, 0, 2_000))),
                "admin",
            )
            .await
            .unwrap();
        assert_eq!(db.payables().list(true).await.unwrap().len(), 1);

        db.products().delete(&p.product.id, "admin").await.unwrap();
        assert!(db.products().get_by_id(&p.product.id).await.unwrap().is_none());
        assert!(db.products().batches(&p.product.id).await.unwrap().is_empty());
        assert!(db.payables().list(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_refused_after_payable_settlement() {
        let db = db().await;
        let p = db
            .products()
            .create(&new_product("Credit Item", 800, 1400, None), "admin")
            .await
            .unwrap();
        db.products()
            .restock(
                &p.product.id,
                &batch(10, None, Some(PaymentSplit::new(0, 0, 8_000))),
                "admin",
            )
            .await
            .unwrap();
        let payable = db.payables().list(true).await.unwrap().remove(0);
        db.payables()
            .settle(&payable.id, &Settlement::new(5_000, 0), "admin")
            .await
            .unwrap();
        let cash_before = db.reports().summary(&Default::default()).await.unwrap().cash_balance;

        let err = db.products().delete(&p.product.id, "admin").await.unwrap_err();
        assert!(matches!(err, DbError::InUse { .. }));

        assert_eq!(db.payables().settlements(&payable.id).await.unwrap().len(), 1);
        let cash_after = db.reports().summary(&Default::default()).await.unwrap().cash_balance;
        assert_eq!(cash_before, cash_after);
        assert_eq!(cash_after.cents(), -5_000);
    }
}
