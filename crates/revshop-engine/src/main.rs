//! # RevShop Demo Checkout
//!
//! Runs one checkout end to end against the payment simulator.
//!
//! ## Usage
//! ```bash
//! # File database, defaults (90% approval, 1.5 s latency)
//! cargo run -p revshop-engine
//!
//! # Throwaway database, always approve, no delay
//! REVSHOP_DB_PATH=:memory: REVSHOP_PAYMENT_APPROVAL_RATE=1 \
//!   REVSHOP_PAYMENT_LATENCY_MS=0 cargo run -p revshop-engine
//! ```
//!
//! Prints the placed order (or the failure) as JSON on stdout. Exits
//! non-zero when the config is invalid or the pool cannot be created.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};

use revshop_core::{PaymentMethod, Role};
use revshop_db::demo::seed_catalogue;
use revshop_db::Database;
use revshop_engine::telemetry::init_tracing;
use revshop_engine::{
    CheckoutCoordinator, CheckoutRequest, EngineConfig, PaymentSimulator, StoredNotificationSink,
};

const DEMO_PRODUCTS_PER_SELLER: usize = 4;
const DEMO_CART_SIZE: usize = 2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = EngineConfig::load()?;
    info!(
        db = %config.database.path.display(),
        status_scope = %config.status_scope(),
        stock_policy = %config.stock_policy(),
        "Starting RevShop demo checkout"
    );

    let db = match Database::new(config.db_config()).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Database pool could not be created");
            std::process::exit(1);
        }
    };

    if db.products().count().await? == 0 {
        seed_catalogue(&db, DEMO_PRODUCTS_PER_SELLER).await?;
    }

    let Some(buyer) = db.users().list_by_role(Role::Buyer).await?.into_iter().next() else {
        error!("No buyer accounts in the database");
        std::process::exit(1);
    };

    let in_stock = db
        .products()
        .list_active(100)
        .await?
        .into_iter()
        .filter(|p| p.stock_quantity > 0)
        .take(DEMO_CART_SIZE);
    for product in in_stock {
        if let Err(e) = db.carts().add_line(buyer.id, product.id, 1).await {
            warn!(product_id = product.id, error = %e, "Could not add demo product to cart");
        }
    }

    let checkout = CheckoutCoordinator::new(
        db.clone(),
        Arc::new(PaymentSimulator::from_settings(&config.payment)),
        Arc::new(StoredNotificationSink::new(db.clone())),
    )
    .with_stock_policy(config.stock_policy());

    let address = buyer
        .address
        .clone()
        .unwrap_or_else(|| "1 Demo Street".to_string());
    let request = CheckoutRequest::new(address, PaymentMethod::CreditCard);

    match checkout.checkout_cart(buyer.id, &request).await {
        Ok(placed) => println!("{}", serde_json::to_string_pretty(&placed)?),
        Err(e) => {
            let failure = json!({ "code": e.code(), "message": e.to_string() });
            println!("{}", serde_json::to_string_pretty(&failure)?);
        }
    }

    db.close().await;
    Ok(())
}
