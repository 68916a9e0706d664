//! # Demo Data
//!
//! Deterministic sellers, buyers and products for local runs. Shared by the
//! `seed` binary and the engine's `revshop` demo.

use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;
use revshop_core::{NewProduct, NewUser, DEFAULT_THRESHOLD_QUANTITY};

/// Seller storefronts: (business name, product names).
const STOREFRONTS: &[(&str, &[&str])] = &[
    (
        "Northwind Home",
        &[
            "Desk Lamp",
            "Ceramic Mug",
            "Linen Throw",
            "Wall Clock",
            "Bamboo Tray",
            "Scented Candle",
        ],
    ),
    (
        "Circuit Corner",
        &[
            "USB-C Cable",
            "Wireless Mouse",
            "Laptop Stand",
            "Bluetooth Speaker",
            "Power Bank",
            "Webcam Cover",
        ],
    ),
    (
        "Paper & Pine",
        &[
            "Dot Grid Notebook",
            "Fountain Pen",
            "Desk Planner",
            "Washi Tape Set",
            "Pencil Case",
            "Sticky Notes",
        ],
    ),
];

const BUYERS: &[(&str, &str, &str, &str)] = &[
    ("ana.lima@example.com", "Ana", "Lima", "12 Harbour Rd, Porto"),
    ("ben.okafor@example.com", "Ben", "Okafor", "4 Kings Ave, Lagos"),
    ("chen.wei@example.com", "Chen", "Wei", "88 Garden St, Suzhou"),
];

/// What a seeding run created.
#[derive(Debug, Clone, Default)]
pub struct SeedSummary {
    pub sellers: Vec<i64>,
    pub buyers: Vec<i64>,
    pub products: Vec<i64>,
}

/// Inserts the demo catalogue. `products_per_seller` is capped by the
/// names available for each storefront.
pub async fn seed_catalogue(db: &Database, products_per_seller: usize) -> DbResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (store_idx, (business, names)) in STOREFRONTS.iter().enumerate() {
        let email = format!("seller{}@revshop.example", store_idx + 1);
        let account = db
            .users()
            .create_seller(
                &NewUser::new(email, "Store", format!("Owner {}", store_idx + 1)),
                business,
                Some("1 Commerce Way"),
            )
            .await?;
        let seller_id = account.user.id;
        summary.sellers.push(seller_id);

        for (idx, name) in names.iter().take(products_per_seller).enumerate() {
            let product = generate_product(seller_id, name, store_idx * 100 + idx);
            let created = db.products().create(&product).await?;
            summary.products.push(created.id);
        }
    }

    for (email, first, last, address) in BUYERS {
        let buyer = db
            .users()
            .create_buyer(&NewUser::new(*email, *first, *last).with_address(*address))
            .await?;
        summary.buyers.push(buyer.id);
    }

    info!(
        sellers = summary.sellers.len(),
        buyers = summary.buyers.len(),
        products = summary.products.len(),
        "Demo catalogue seeded"
    );
    Ok(summary)
}

/// Price $4.99 to $49.99, every third product discounted 10%, stock 0 to 40.
fn generate_product(seller_id: i64, name: &str, seed: usize) -> NewProduct {
    let price_cents = 499 + ((seed * 37) % 46) as i64 * 100;
    let discount_price_cents = (seed % 3 == 0).then(|| price_cents * 9 / 10);
    let stock_quantity = ((seed * 13) % 41) as i64;

    NewProduct {
        seller_id,
        name: name.to_string(),
        description: Some(format!("{name}, demo listing")),
        category: None,
        price_cents,
        list_price_cents: price_cents,
        discount_price_cents,
        stock_quantity,
        threshold_quantity: DEFAULT_THRESHOLD_QUANTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;

    #[tokio::test]
    async fn test_seed_catalogue() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let summary = seed_catalogue(&db, 4).await.unwrap();

        assert_eq!(summary.sellers.len(), 3);
        assert_eq!(summary.buyers.len(), 3);
        assert_eq!(summary.products.len(), 12);
        assert_eq!(db.products().count().await.unwrap(), 12);
    }

    #[test]
    fn test_generated_discount_never_exceeds_list_price() {
        for seed in 0..50 {
            let p = generate_product(1, "X", seed);
            if let Some(d) = p.discount_price_cents {
                assert!(d <= p.list_price_cents);
            }
            assert!(p.stock_quantity >= 0);
        }
    }
}
