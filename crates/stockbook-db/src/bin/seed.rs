//! # Seed Data Generator
//!
//! Populates the database with a small demo shop for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p stockbook-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db
//! ```
//!
//! ## Generated Data
//! - Categories with a handful of products each (stock, cost, price)
//! - Services with default prices
//!
//! Nothing is sold; totals start at zero.

use std::env;
use stockbook_db::{Database, DbConfig, ProductFilter, ProductInput, ServiceInput};

/// (category, [(product, quantity, cost cents, price cents)])
const CATALOG: &[(&str, &[(&str, i64, i64, i64)])] = &[
    (
        "Grocery",
        &[
            ("Rice 1kg", 40, 450, 600),
            ("Sugar 1kg", 30, 380, 500),
            ("Cooking Oil 1L", 24, 900, 1200),
            ("Flour 2kg", 20, 700, 950),
            ("Salt 500g", 50, 80, 150),
        ],
    ),
    (
        "Beverages",
        &[
            ("Mineral Water 500ml", 120, 30, 60),
            ("Cola 330ml", 96, 55, 100),
            ("Orange Juice 1L", 18, 250, 400),
            ("Black Tea 100 bags", 15, 320, 480),
        ],
    ),
    (
        "Household",
        &[
            ("Laundry Soap", 36, 120, 200),
            ("Dish Sponge", 60, 25, 60),
            ("Matches (10 boxes)", 25, 90, 150),
            ("Candles (6 pack)", 20, 150, 250),
        ],
    ),
    (
        "Phone Accessories",
        &[
            ("USB-C Cable", 15, 300, 700),
            ("Micro USB Cable", 15, 200, 500),
            ("Wall Charger", 10, 600, 1300),
            ("Screen Protector", 30, 100, 400),
        ],
    ),
];

/// (service, default price cents)
const SERVICES: &[(&str, i64)] = &[
    ("Phone charging", 50),
    ("Screen protector fitting", 200),
    ("Mobile money transfer", 100),
    ("Photocopy (per page)", 10),
    ("Home delivery", 300),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockbook_dev.db");

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
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockbook Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list(&ProductFilter::default()).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut products = 0;
    for (category_name, items) in CATALOG {
        let category = db.categories().create(category_name).await?;

        for (name, quantity, cost_cents, price_cents) in items.iter() {
            let input = ProductInput {
                name: name.to_string(),
                category_id: Some(category.id.clone()),
                quantity: *quantity,
                initial_price_cents: *cost_cents,
                selling_price_cents: *price_cents,
            };

            if let Err(e) = db.products().create(&input).await {
                eprintln!("Failed to insert {}: {}", name, e);
                continue;
            }
            products += 1;
        }

        println!("  {} ({} products)", category_name, items.len());
    }

    let mut services = 0;
    for (name, price_cents) in SERVICES {
        let input = ServiceInput {
            name: name.to_string(),
            default_price_cents: *price_cents,
        };

        if let Err(e) = db.services().create(&input).await {
            eprintln!("Failed to insert {}: {}", name, e);
            continue;
        }
        services += 1;
    }

    println!();
    println!(
        "✓ Generated {} categories, {} products, {} services",
        CATALOG.len(),
        products,
        services
    );

    db.close().await;
    println!("✓ Seed complete!");

    Ok(())
}
