//! # Seed Data Generator
//!
//! Populates a database with a small demo shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./haze_dev.db
//! cargo run -p haze-db --bin seed
//!
//! # Specify database path
//! cargo run -p haze-db --bin seed -- --db ./data/haze.db
//! ```
//!
//! ## Generated Data
//! - Opening owner capital (cash + digital)
//! - A catalogue of e-liquids, disposables, devices and accessories, each
//!   with an opening batch; some batches left partly due to the supplier
//! - A handful of sales across the last two weeks, some on credit
//! - Rent and utility expenses, one tester write-off
//!
//! Logins are not seeded: haze-api creates the bootstrap admin on startup.

use std::env;

use anyhow::Context;
use chrono::{Duration, Utc};
use haze_core::input::{
    NewBatch, NewCapitalEntry, NewExpense, NewProduct, NewSale, NewSaleItem, WriteOff,
    WriteOffKind,
};
use haze_core::{CapitalKind, Money, PaymentSplit};
use haze_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ACTOR: &str = "seed";

/// (name, category, cost cents, selling cents, opening quantity, supplier)
const CATALOGUE: &[(&str, &str, i64, i64, i64, &str)] = &[
    ("Mango Ice 30ml", "E-Liquid", 700, 1_200, 40, "Vapor Wholesale"),
    ("Blue Razz 30ml", "E-Liquid", 700, 1_200, 36, "Vapor Wholesale"),
    ("Mint Freeze 30ml", "E-Liquid", 650, 1_100, 30, "Vapor Wholesale"),
    ("Strawberry Kiwi 60ml", "E-Liquid", 1_100, 1_900, 18, "Cloud Nine Supply"),
    ("Disposable 5000 Grape", "Disposables", 600, 1_100, 50, "Cloud Nine Supply"),
    ("Disposable 5000 Watermelon", "Disposables", 600, 1_100, 45, "Cloud Nine Supply"),
    ("Pod Kit 25W", "Devices", 1_800, 3_200, 12, "Device Direct"),
    ("Box Mod 80W", "Devices", 3_500, 5_900, 6, "Device Direct"),
    ("Mesh Coil 0.4Ω (5-pack)", "Accessories", 450, 900, 25, "Device Direct"),
    ("18650 Battery", "Accessories", 400, 800, 4, "Device Direct"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./haze_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Haze Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./haze_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let today = Utc::now().date_naive();

    // Opening capital
    db.capital()
        .create(
            &NewCapitalEntry {
                date: Some(today - Duration::days(15)),
                kind: CapitalKind::Investment,
                amount_cents: 500_000,
                payment: Some(PaymentSplit::new(300_000, 200_000, 0)),
                note: Some("Opening capital".to_string()),
            },
            ACTOR,
        )
        .await?;

    // Catalogue with opening batches; every third one bought partly on credit
    let mut products = Vec::with_capacity(CATALOGUE.len());
    for (idx, (name, category, cost, selling, qty, supplier)) in CATALOGUE.iter().enumerate() {
        let total = Money::from_cents(*cost).multiply_quantity(*qty).cents();
        let payment = if idx % 3 == 0 {
            PaymentSplit::new(total / 2, 0, total - total / 2)
        } else {
            PaymentSplit::all_cash(Money::from_cents(total))
        };

        let created = db
            .products()
            .create(
                &NewProduct {
                    name: name.to_string(),
                    category: category.to_string(),
                    cost_price_cents: *cost,
                    selling_price_cents: *selling,
                    low_stock_threshold: None,
                    initial_stock: Some(NewBatch {
                        date: Some(today - Duration::days(14)),
                        quantity: *qty,
                        cost_price_cents: None,
                        supplier: Some(supplier.to_string()),
                        payment: Some(payment),
                        note: None,
                    }),
                },
                ACTOR,
            )
            .await
            .with_context(|| format!("creating {name}"))?;
        products.push(created);
    }
    info!(count = products.len(), "Products created");

    // Sales spread across the last two weeks
    let mut sales = 0;
    for day in 0..14_i64 {
        let a = &products[(day as usize) % products.len()];
        let b = &products[(day as usize * 3 + 1) % products.len()];
        let qty_a = 1 + day % 3;

        let total = a.product.selling_price().multiply_quantity(qty_a) + b.product.selling_price();
        let on_credit = day % 5 == 0;
        let payment = if on_credit {
            PaymentSplit::new(0, total.cents() / 2, total.cents() - total.cents() / 2)
        } else if day % 2 == 0 {
            PaymentSplit::all_cash(total)
        } else {
            PaymentSplit::new(0, total.cents(), 0)
        };

        let result = db
            .sales()
            .create(
                &NewSale {
                    date: Some(today - Duration::days(13 - day)),
                    customer_name: on_credit.then(|| format!("Regular #{day}")),
                    customer_phone: on_credit.then(|| format!("0171100{day:04}")),
                    items: vec![
                        NewSaleItem {
                            product_id: a.product.id.clone(),
                            quantity: qty_a,
                            unit_price_cents: None,
                        },
                        NewSaleItem {
                            product_id: b.product.id.clone(),
                            quantity: 1,
                            unit_price_cents: None,
                        },
                    ],
                    payment,
                },
                "Rafi",
            )
            .await;

        match result {
            Ok(_) => sales += 1,
            Err(e) => warn!(day, error = %e, "Skipped demo sale"),
        }
    }
    info!(count = sales, "Sales created");

    // Running costs
    for (days_ago, category, amount, payment, payee) in [
        (10, "Rent", 120_000, PaymentSplit::new(0, 120_000, 0), None),
        (7, "Utilities", 8_500, PaymentSplit::new(8_500, 0, 0), None),
        (
            3,
            "Shop fit-out",
            40_000,
            PaymentSplit::new(15_000, 0, 25_000),
            Some("Carpenter"),
        ),
    ] {
        db.expenses()
            .create(
                &NewExpense {
                    date: Some(today - Duration::days(days_ago)),
                    category: category.to_string(),
                    description: None,
                    amount_cents: amount,
                    payment: Some(payment),
                    payee: payee.map(str::to_string),
                },
                ACTOR,
            )
            .await?;
    }

    db.products()
        .write_off(
            &products[0].product.id,
            WriteOffKind::Tester,
            &WriteOff {
                quantity: 1,
                note: Some("Counter tester".to_string()),
            },
            "Rafi",
        )
        .await?;

    let summary = db.reports().summary(&Default::default()).await?;
    info!(
        revenue = %summary.revenue,
        net_profit = %summary.net_profit,
        cash = %summary.cash_balance,
        digital = %summary.digital_balance,
        inventory = %summary.inventory_value,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
