//! # Payment Gateway
//!
//! The seam between checkout and whoever moves the money.
//!
//! ```text
//! CheckoutCoordinator
//!      │ process(total, method)      (awaited, never cancelled once started)
//!      ▼
//! Arc<dyn PaymentGateway>
//!      ├── PaymentSimulator          (approval roll + simulated latency)
//!      └── test doubles / real providers
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use revshop_core::{Money, PaymentMethod};

use crate::config::PaymentSettings;

/// Proof of an approved payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Gateway reference, `TXN-<uuid>` for the simulator.
    pub transaction_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub processed_at: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn new(transaction_id: impl Into<String>, amount: Money, method: PaymentMethod) -> Self {
        PaymentReceipt {
            transaction_id: transaction_id.into(),
            amount,
            method,
            processed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("declined: {reason}")]
    Declined { reason: String },

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount`. Returns only after the gateway has decided.
    async fn process(&self, amount: Money, method: PaymentMethod) -> Result<PaymentReceipt, PaymentError>;
}

// =============================================================================
// Simulator
// =============================================================================

/// Approves a configurable share of payments after a fixed delay.
#[derive(Debug, Clone)]
pub struct PaymentSimulator {
    approval_rate: f64,
    latency: Duration,
}

impl PaymentSimulator {
    /// `approval_rate` is clamped into [0, 1].
    pub fn new(approval_rate: f64, latency: Duration) -> Self {
        let approval_rate = if approval_rate.is_finite() {
            approval_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        PaymentSimulator {
            approval_rate,
            latency,
        }
    }

    pub fn from_settings(settings: &PaymentSettings) -> Self {
        Self::new(settings.approval_rate, Duration::from_millis(settings.latency_ms))
    }

    /// Approves everything, instantly.
    pub fn always_approve() -> Self {
        Self::new(1.0, Duration::ZERO)
    }

    /// Declines everything, instantly.
    pub fn always_decline() -> Self {
        Self::new(0.0, Duration::ZERO)
    }

    pub fn approval_rate(&self) -> f64 {
        self.approval_rate
    }
}

impl Default for PaymentSimulator {
    fn default() -> Self {
        Self::from_settings(&PaymentSettings::default())
    }
}

#[async_trait]
impl PaymentGateway for PaymentSimulator {
    #[instrument(skip_all, fields(amount = %amount, method = %method))]
    async fn process(&self, amount: Money, method: PaymentMethod) -> Result<PaymentReceipt, PaymentError> {
        info!("Processing payment");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let approved = rand::rng().random_bool(self.approval_rate);
        if !approved {
            warn!("Payment declined by simulator");
            return Err(PaymentError::Declined {
                reason: "Payment was declined by the simulated gateway".to_string(),
            });
        }

        let receipt = PaymentReceipt::new(format!("TXN-{}", Uuid::new_v4()), amount, method);
        info!(transaction_id = %receipt.transaction_id, "Payment approved");
        Ok(receipt)
    }
}
