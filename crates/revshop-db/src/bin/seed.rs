//! # Seed Data Generator
//!
//! Populates a database with demo sellers, buyers and products.
//!
//! ## Usage
//! ```bash
//! # Seed ./revshop_dev.db with 6 products per seller (default)
//! cargo run -p revshop-db --bin seed
//!
//! # Fewer products
//! cargo run -p revshop-db --bin seed -- --per-seller 3
//!
//! # Specify database path
//! cargo run -p revshop-db --bin seed -- --db ./data/revshop.db
//! ```

use std::env;

use revshop_db::demo::seed_catalogue;
use revshop_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut per_seller: usize = 6;
    let mut db_path = String::from("./revshop_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--per-seller" | "-p" => {
                if i + 1 < args.len() {
                    per_seller = args[i + 1].parse().unwrap_or(6);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("RevShop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --per-seller <N>  Products per seller (default: 6)");
                println!("  -d, --db <PATH>       Database file path (default: ./revshop_dev.db)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("RevShop Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let summary = seed_catalogue(&db, per_seller).await?;

    println!();
    println!(
        "✓ Seeded {} sellers, {} buyers, {} products in {:?}",
        summary.sellers.len(),
        summary.buyers.len(),
        summary.products.len(),
        start.elapsed()
    );

    for seller in &summary.sellers {
        let low = db.products().low_stock_for_seller(*seller).await?;
        println!("  Seller {}: {} products at or under threshold", seller, low.len());
    }

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
