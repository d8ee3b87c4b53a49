pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{HealthMetric, LogLevel, Processor, ProcessorUpdate, SystemLog, Transaction};

pub use memory::InMemoryStateStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("processor {0} not found")]
    ProcessorNotFound(Uuid),
    #[error("transaction {0} not found")]
    TransactionNotFound(Uuid),
    #[error("health metric references unknown processor {0}")]
    OrphanedHealthMetric(Uuid),
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub total_transactions: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: f64,
    pub active_processors: u64,
}

/// Single storage interface for processors, transactions, health metrics
/// and system logs. All operations are atomic with respect to the single
/// row they touch; there is no cross-row transaction in the core contract.
/// Implementations may be swapped (e.g. for a relational backend) without
/// the engine or any other component changing.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_processor(&self, id: Uuid) -> Result<Option<Processor>, StoreError>;

    /// Sorted by `(priority, id)`.
    async fn get_all_processors(&self) -> Result<Vec<Processor>, StoreError>;

    /// Enabled AND circuit closed, sorted by `(priority, id)`.
    async fn get_active_processors(&self) -> Result<Vec<Processor>, StoreError>;

    async fn update_processor(
        &self,
        id: Uuid,
        update: ProcessorUpdate,
    ) -> Result<Processor, StoreError>;

    async fn create_processor(&self, processor: Processor) -> Result<(), StoreError>;

    async fn create_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    async fn update_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;

    /// Sorted by `created_at DESC`.
    async fn get_transactions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn get_total_transaction_count(&self) -> Result<u64, StoreError>;

    async fn create_health_metric(&self, metric: HealthMetric) -> Result<(), StoreError>;

    /// Most recent sample per processor.
    async fn get_latest_health_metrics(&self) -> Result<Vec<HealthMetric>, StoreError>;

    async fn create_system_log(&self, log: SystemLog) -> Result<(), StoreError>;

    async fn get_system_logs(
        &self,
        limit: usize,
        level: Option<LogLevel>,
    ) -> Result<Vec<SystemLog>, StoreError>;

    async fn get_system_stats(&self) -> Result<SystemStats, StoreError>;
}

/// Used internally to stamp `updated_at` without requiring callers to pass
/// a clock; kept as a free function so it is trivially mockable in tests.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
