//! Pure reader that composes a system snapshot: processor health, breaker
//! state, and aggregate counts in one call. Never mutates the store.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::breaker::CircuitBreaker;
use crate::priority::{PrioritySource, PrioritySourceKind};
use crate::store::{StateStore, StoreError, SystemStats};

#[derive(Debug, Clone, Serialize)]
pub struct ProcessorSnapshot {
    pub id: Uuid,
    pub name: String,
    pub enabled: bool,
    pub circuit_breaker_open: bool,
    pub success_rate: f64,
    pub avg_response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub processor_id: Uuid,
    pub name: String,
    pub is_open: bool,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub uptime_secs: u64,
    pub processors: Vec<ProcessorSnapshot>,
    pub circuit_breakers: Vec<BreakerSnapshot>,
    pub stats: SystemStats,
    pub priority_source: PrioritySourceKind,
}

pub struct HealthAggregator {
    store: Arc<dyn StateStore>,
    breaker: Arc<CircuitBreaker>,
    priority_source: Arc<dyn PrioritySource>,
    started_at: Instant,
}

impl HealthAggregator {
    pub fn new(
        store: Arc<dyn StateStore>,
        breaker: Arc<CircuitBreaker>,
        priority_source: Arc<dyn PrioritySource>,
    ) -> Self {
        Self {
            store,
            breaker,
            priority_source,
            started_at: Instant::now(),
        }
    }

    pub async fn snapshot(&self) -> Result<HealthSnapshot, StoreError> {
        let processors = self.store.get_all_processors().await?;
        let stats = self.store.get_system_stats().await?;
        let breaker_statuses = self.breaker.get_status();

        let processor_snapshots: Vec<ProcessorSnapshot> = processors
            .iter()
            .map(|p| ProcessorSnapshot {
                id: p.id,
                name: p.name.clone(),
                enabled: p.enabled,
                circuit_breaker_open: p.circuit_breaker_open,
                success_rate: p.success_rate,
                avg_response_time_ms: p.response_time_ms,
            })
            .collect();

        let name_by_id: std::collections::HashMap<Uuid, String> =
            processors.iter().map(|p| (p.id, p.name.clone())).collect();

        let breaker_snapshots: Vec<BreakerSnapshot> = breaker_statuses
            .into_iter()
            .map(|s| BreakerSnapshot {
                processor_id: s.processor_id,
                name: name_by_id
                    .get(&s.processor_id)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                is_open: s.is_open,
                consecutive_failures: s.consecutive_failures,
            })
            .collect();

        let status = if stats.active_processors > 0 {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        };

        Ok(HealthSnapshot {
            status,
            uptime_secs: self.started_at.elapsed().as_secs(),
            processors: processor_snapshots,
            circuit_breakers: breaker_snapshots,
            stats,
            priority_source: self.priority_source.kind(),
        })
    }
}
