use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point sample attributed to one processor. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetric {
    pub id: Uuid,
    pub processor_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub success_count: u32,
    pub failure_count: u32,
    pub avg_response_time_ms: u64,
    pub total_transactions: u64,
}

impl HealthMetric {
    pub fn success(processor_id: Uuid, latency_ms: u64, total_transactions: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            processor_id,
            timestamp: Utc::now(),
            success_count: 1,
            failure_count: 0,
            avg_response_time_ms: latency_ms,
            total_transactions,
        }
    }

    pub fn failure(processor_id: Uuid, latency_ms: u64, total_transactions: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            processor_id,
            timestamp: Utc::now(),
            success_count: 0,
            failure_count: 1,
            avg_response_time_ms: latency_ms,
            total_transactions,
        }
    }
}
