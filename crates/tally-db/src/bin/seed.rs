//! # Seed Data Generator
//!
//! Writes a small demo dataset into a station database.
//!
//! ## Usage
//! ```bash
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//!
//! # Replace whatever is already stored
//! cargo run -p tally-db --bin seed -- --force
//! ```
//!
//! ## Generated Data
//! - Categories with a handful of products each (sequence ids from 1)
//! - Two customers, one of them on unlimited credit
//! - One supplier
//! - An OPEN drawer movement for today

use chrono::Utc;
use std::env;
use tally_core::{
    CashChannel, CashMovement, Collection, Customer, Dataset, Money, MovementCategory,
    MovementType, Product, Supplier,
};
use tally_db::{Database, DbConfig};

/// (category, [(product, price in cents, stock)])
const CATALOG: &[(&str, &[(&str, i64, i64)])] = &[
    (
        "Drinks",
        &[
            ("Cola 600ml", 1_800, 48),
            ("Mineral Water 1L", 1_200, 60),
            ("Orange Juice 1L", 3_200, 24),
            ("Iced Tea 500ml", 1_600, 36),
        ],
    ),
    (
        "Snacks",
        &[
            ("Potato Chips", 1_900, 30),
            ("Peanuts 200g", 2_400, 20),
            ("Chocolate Bar", 1_500, 40),
        ],
    ),
    (
        "Bakery",
        &[
            ("White Bread", 4_200, 12),
            ("Croissant", 1_400, 18),
            ("Birthday Cake (order)", 45_000, 0),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -f, --force        Overwrite existing collections");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let store = db.store();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.kv().keys().await?;
    if !existing.is_empty() && !force {
        println!("⚠ Database already has {} stored collections", existing.len());
        println!("  Skipping seed. Pass --force to overwrite.");
        return Ok(());
    }

    let dataset = demo_dataset();

    for collection in Collection::ALL {
        let value = dataset.collection_value(collection)?;
        store.save(collection.key(), &value).await?;
        println!("  wrote {:<14} {}", collection.key(), describe(&value));
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

fn demo_dataset() -> Dataset {
    let now = Utc::now();
    let mut ds = Dataset::new();
    ds.settings.store.name = "Demo Corner Shop".to_string();

    for (category, products) in CATALOG {
        ds.categories.push(category.to_string());
        for (name, price, stock) in products.iter() {
            let mut product = Product::new(*name, Money::from_cents(*price), *stock, now);
            product.category = Some(category.to_string());
            product.cost = Money::from_cents(price * 65 / 100);
            product.min_stock = 5;
            // Made-to-order items are not counted.
            product.track_inventory = *stock > 0;
            ds.upsert(product);
        }
    }

    let mut regular = Customer::new("Maria Lopez", Money::from_cents(50_000), now);
    regular.phone = Some("555-0101".to_string());
    ds.upsert(regular);

    let mut office = Customer::new("Riverside Office", Money::zero(), now);
    office.unlimited_credit = true;
    ds.upsert(office);

    ds.upsert(Supplier {
        id: String::new(),
        name: "Northside Beverages".to_string(),
        contact_name: Some("Jon".to_string()),
        phone: None,
        email: Some("orders@northside.test".to_string()),
        created_at: now,
    });

    ds.upsert(CashMovement {
        id: String::new(),
        movement_type: MovementType::Open,
        amount: Money::from_cents(20_000),
        channel: CashChannel::Physical,
        category: MovementCategory::Other,
        transaction_id: None,
        description: Some("Opening float".to_string()),
        user_id: None,
        created_at: now,
    });

    ds
}

fn describe(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Array(items) => format!("{} items", items.len()),
        _ => "record".to_string(),
    }
}
