//! Deterministic/seeded-random adapter so the waterfall can be exercised
//! in tests and local development without live HTTP backends behind it.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use crate::utils::money::Money;

use super::{AdapterError, AdapterHealth, AdapterPaymentOutcome, ProcessorAdapter};

pub struct SimulatedAdapter {
    success_rate: f64,
    latency_ms: u64,
}

impl SimulatedAdapter {
    pub fn new(success_rate: f64, latency_ms: u64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            latency_ms,
        }
    }

    /// Always succeeds; handy for unit tests that need a deterministic
    /// winner with no timing noise.
    pub fn always_succeeds() -> Self {
        Self::new(1.0, 1)
    }

    /// Always fails as a processor decline (not a fault).
    pub fn always_declines() -> Self {
        Self::new(0.0, 1)
    }
}

#[async_trait]
impl ProcessorAdapter for SimulatedAdapter {
    async fn process_payment(
        &self,
        _amount: &Money,
        _currency: &str,
        _metadata: &serde_json::Value,
    ) -> Result<AdapterPaymentOutcome, AdapterError> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }

        let roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
        if roll < self.success_rate {
            Ok(AdapterPaymentOutcome {
                transaction_id: Uuid::new_v4().to_string(),
                processing_time_ms: self.latency_ms,
            })
        } else {
            Err(AdapterError::Declined {
                message: "simulated decline".to_string(),
                code: None,
            })
        }
    }

    async fn health_check(&self) -> AdapterHealth {
        AdapterHealth {
            healthy: self.success_rate > 0.0,
            response_time_ms: self.latency_ms,
            error: None,
        }
    }
}
