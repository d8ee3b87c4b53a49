pub mod http;
pub mod registry;
pub mod simulated;

use async_trait::async_trait;
use thiserror::Error;

use crate::utils::money::Money;

pub use registry::AdapterRegistry;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("processor declined: {message}")]
    Declined { message: String, code: Option<String> },
    #[error("adapter call failed: {0}")]
    Fault(String),
}

/// Outcome of `process_payment` on success.
#[derive(Debug, Clone)]
pub struct AdapterPaymentOutcome {
    pub transaction_id: String,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AdapterHealth {
    pub healthy: bool,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

/// Uniform contract for a single backend. Adapters MUST return within a
/// bounded time; the engine imposes the deadline via `tokio::time::timeout`
/// around this call rather than relying on the adapter to self-limit.
#[async_trait]
pub trait ProcessorAdapter: Send + Sync {
    async fn process_payment(
        &self,
        amount: &Money,
        currency: &str,
        metadata: &serde_json::Value,
    ) -> Result<AdapterPaymentOutcome, AdapterError>;

    async fn health_check(&self) -> AdapterHealth;
}
