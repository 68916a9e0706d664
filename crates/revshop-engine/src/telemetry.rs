//! # Tracing Setup
//!
//! Called once by binaries. Libraries only emit events.
//!
//! `RUST_LOG` overrides the default filter:
//! ```bash
//! RUST_LOG=revshop_engine=trace,sqlx=info cargo run -p revshop-engine
//! ```

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,revshop=debug,sqlx=warn";

/// Installs the global fmt subscriber. Panics if one is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
