use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{
    HealthMetric, LogLevel, Processor, ProcessorUpdate, SystemLog, Transaction, TransactionStatus,
};

use super::{now, StateStore, StoreError, SystemStats};

/// Default, map-backed `StateStore`. Processors and transactions live in
/// `DashMap`s keyed by id for O(1) row access; health metrics and system
/// logs are append-only, so a simple lock-guarded `Vec` preserves arrival
/// order without extra bookkeeping.
pub struct InMemoryStateStore {
    processors: DashMap<Uuid, Processor>,
    transactions: DashMap<Uuid, Transaction>,
    health_metrics: Mutex<Vec<HealthMetric>>,
    system_logs: Mutex<Vec<SystemLog>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            processors: DashMap::new(),
            transactions: DashMap::new(),
            health_metrics: Mutex::new(Vec::new()),
            system_logs: Mutex::new(Vec::new()),
        }
    }

    fn sorted_processors(&self) -> Vec<Processor> {
        let mut all: Vec<Processor> = self.processors.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|p| p.order_key());
        all
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_processor(&self, id: Uuid) -> Result<Option<Processor>, StoreError> {
        Ok(self.processors.get(&id).map(|e| e.value().clone()))
    }

    async fn get_all_processors(&self) -> Result<Vec<Processor>, StoreError> {
        Ok(self.sorted_processors())
    }

    async fn get_active_processors(&self) -> Result<Vec<Processor>, StoreError> {
        Ok(self
            .sorted_processors()
            .into_iter()
            .filter(|p| p.enabled && !p.circuit_breaker_open)
            .collect())
    }

    async fn update_processor(
        &self,
        id: Uuid,
        update: ProcessorUpdate,
    ) -> Result<Processor, StoreError> {
        let mut entry = self
            .processors
            .get_mut(&id)
            .ok_or(StoreError::ProcessorNotFound(id))?;

        if let Some(enabled) = update.enabled {
            entry.enabled = enabled;
        }
        if let Some(open) = update.circuit_breaker_open {
            entry.circuit_breaker_open = open;
        }
        if let Some(failures) = update.consecutive_failures {
            entry.consecutive_failures = failures;
        }
        if let Some(last_failure) = update.last_failure_time {
            entry.last_failure_time = last_failure;
        }
        entry.updated_at = now();

        Ok(entry.clone())
    }

    async fn create_processor(&self, processor: Processor) -> Result<(), StoreError> {
        self.processors.insert(processor.id, processor);
        Ok(())
    }

    async fn create_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        self.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    async fn update_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        if !self.transactions.contains_key(&transaction.id) {
            return Err(StoreError::TransactionNotFound(transaction.id));
        }
        self.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.get(&id).map(|e| e.value().clone()))
    }

    async fn get_transactions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut all: Vec<Transaction> =
            self.transactions.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_total_transaction_count(&self) -> Result<u64, StoreError> {
        Ok(self.transactions.len() as u64)
    }

    async fn create_health_metric(&self, metric: HealthMetric) -> Result<(), StoreError> {
        if !self.processors.contains_key(&metric.processor_id) {
            return Err(StoreError::OrphanedHealthMetric(metric.processor_id));
        }
        self.health_metrics.lock().push(metric);
        Ok(())
    }

    async fn get_latest_health_metrics(&self) -> Result<Vec<HealthMetric>, StoreError> {
        let metrics = self.health_metrics.lock();
        let mut seen = std::collections::HashSet::new();
        let mut latest = Vec::new();
        for metric in metrics.iter().rev() {
            if seen.insert(metric.processor_id) {
                latest.push(metric.clone());
            }
        }
        Ok(latest)
    }

    async fn create_system_log(&self, log: SystemLog) -> Result<(), StoreError> {
        self.system_logs.lock().push(log);
        Ok(())
    }

    async fn get_system_logs(
        &self,
        limit: usize,
        level: Option<LogLevel>,
    ) -> Result<Vec<SystemLog>, StoreError> {
        let logs = self.system_logs.lock();
        let filtered: Vec<SystemLog> = logs
            .iter()
            .rev()
            .filter(|l| level.map(|lv| l.level == lv).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn get_system_stats(&self) -> Result<SystemStats, StoreError> {
        let total_transactions = self.transactions.len() as u64;
        let mut success_count = 0u64;
        let mut response_time_sum = 0u64;
        let mut response_time_count = 0u64;

        for entry in self.transactions.iter() {
            let tx = entry.value();
            if tx.status == TransactionStatus::Success {
                success_count += 1;
            }
            if let Some(ms) = tx.processing_time_ms {
                response_time_sum += ms;
                response_time_count += 1;
            }
        }

        let success_rate = if total_transactions > 0 {
            (success_count as f64 / total_transactions as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let avg_response_time_ms = if response_time_count > 0 {
            (response_time_sum as f64 / response_time_count as f64).round()
        } else {
            0.0
        };

        let active_processors = self
            .processors
            .iter()
            .filter(|e| e.value().enabled && !e.value().circuit_breaker_open)
            .count() as u64;

        Ok(SystemStats {
            total_transactions,
            success_rate,
            avg_response_time_ms,
            active_processors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdapterConfig;
    use serde_json::json;

    fn sample_processor(name: &str, priority: i32) -> Processor {
        Processor::new(
            name,
            "http",
            priority,
            AdapterConfig::Simulated {
                success_rate: 1.0,
                latency_ms: 10,
            },
            99.0,
            50,
        )
    }

    #[tokio::test]
    async fn transaction_round_trips_through_terminal_update() {
        let store = InMemoryStateStore::new();
        let transaction = Transaction::new_pending(
            crate::utils::money::Money::parse("42.00").unwrap(),
            "USD".to_string(),
            json!({"order": "abc"}),
        );
        let id = transaction.id;
        store.create_transaction(transaction.clone()).await.unwrap();

        let mut finalized = transaction;
        finalized.status = TransactionStatus::Success;
        finalized.processor_id = Some(Uuid::new_v4());
        finalized.processor_transaction_id = Some("ext-123".to_string());
        finalized.processing_time_ms = Some(77);
        store.update_transaction(finalized.clone()).await.unwrap();

        let fetched = store.get_transaction(id).await.unwrap().unwrap();
        assert_eq!(fetched.status, finalized.status);
        assert_eq!(fetched.processor_id, finalized.processor_id);
        assert_eq!(fetched.processor_transaction_id, finalized.processor_transaction_id);
        assert_eq!(fetched.processing_time_ms, finalized.processing_time_ms);
    }

    #[tokio::test]
    async fn active_processors_excludes_disabled_and_open_circuits() {
        let store = InMemoryStateStore::new();
        let p1 = sample_processor("p1", 1);
        let mut p2 = sample_processor("p2", 2);
        p2.enabled = false;
        let mut p3 = sample_processor("p3", 3);
        p3.circuit_breaker_open = true;

        store.create_processor(p1.clone()).await.unwrap();
        store.create_processor(p2).await.unwrap();
        store.create_processor(p3).await.unwrap();

        let active = store.get_active_processors().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, p1.id);
    }

    #[tokio::test]
    async fn processors_sorted_by_priority_then_id() {
        let store = InMemoryStateStore::new();
        let p_low = sample_processor("low", 5);
        let p_high = sample_processor("high", 1);
        store.create_processor(p_low.clone()).await.unwrap();
        store.create_processor(p_high.clone()).await.unwrap();

        let all = store.get_all_processors().await.unwrap();
        assert_eq!(all[0].id, p_high.id);
        assert_eq!(all[1].id, p_low.id);
    }

    #[tokio::test]
    async fn health_metric_rejects_orphan_processor() {
        let store = InMemoryStateStore::new();
        let metric = HealthMetric::success(Uuid::new_v4(), 10, 1);
        let result = store.create_health_metric(metric).await;
        assert!(matches!(result, Err(StoreError::OrphanedHealthMetric(_))));
    }

    #[tokio::test]
    async fn system_stats_match_transaction_counts() {
        let store = InMemoryStateStore::new();
        let mut tx1 = Transaction::new_pending(
            crate::utils::money::Money::parse("10.00").unwrap(),
            "USD".to_string(),
            json!({}),
        );
        tx1.status = TransactionStatus::Success;
        tx1.processing_time_ms = Some(100);
        store.create_transaction(tx1).await.unwrap();

        let mut tx2 = Transaction::new_pending(
            crate::utils::money::Money::parse("5.00").unwrap(),
            "USD".to_string(),
            json!({}),
        );
        tx2.status = TransactionStatus::Failed;
        tx2.processing_time_ms = Some(200);
        store.create_transaction(tx2).await.unwrap();

        let stats = store.get_system_stats().await.unwrap();
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.avg_response_time_ms, 150.0);
    }

    proptest::proptest! {
        /// I8: toggling a processor's `enabled` flag an even number of times
        /// returns it to its original value with no other field disturbed.
        #[test]
        fn i8_toggle_idempotence(initial_enabled in proptest::prelude::any::<bool>(), toggle_count in 0u32..20) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let store = InMemoryStateStore::new();
                let mut processor = sample_processor("p1", 1);
                processor.enabled = initial_enabled;
                let id = processor.id;
                let success_rate = processor.success_rate;
                store.create_processor(processor).await.unwrap();

                let mut current = initial_enabled;
                for _ in 0..toggle_count {
                    current = !current;
                    store
                        .update_processor(id, ProcessorUpdate { enabled: Some(current), ..Default::default() })
                        .await
                        .unwrap();
                }

                let final_processor = store.get_processor(id).await.unwrap().unwrap();
                let expected = if toggle_count % 2 == 0 { initial_enabled } else { !initial_enabled };
                proptest::prop_assert_eq!(final_processor.enabled, expected);
                proptest::prop_assert_eq!(final_processor.success_rate, success_rate);
                Ok(())
            })?;
        }
    }
}
