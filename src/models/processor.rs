use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Credential/parameter bag for one processor adapter, tagged by the shape
/// the backend expects. Mirrors the "enumerated set per adapter type" in
/// the adapter design notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterConfig {
    ApiKey { api_key: String },
    ClientCredentials { client_id: String, client_secret: String },
    AppId { app_id: String },
    Merchant { merchant_account: String, api_key: String },
    Http { base_url: String, token: String },
    Simulated { success_rate: f64, latency_ms: u64 },
}

/// A configured payment backend. Field names and meanings follow the data
/// model 1:1 so a durable store can be swapped in without remapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Processor {
    pub id: Uuid,
    pub name: String,
    /// Discriminator selecting the adapter implementation in the registry.
    pub processor_type: String,
    /// Lower tries first; ties are broken by `id`.
    pub priority: i32,
    pub enabled: bool,
    pub config: AdapterConfig,
    pub success_rate: f64,
    pub response_time_ms: u64,
    pub circuit_breaker_open: bool,
    pub consecutive_failures: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Processor {
    pub fn new(
        name: impl Into<String>,
        processor_type: impl Into<String>,
        priority: i32,
        config: AdapterConfig,
        success_rate: f64,
        response_time_ms: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            processor_type: processor_type.into(),
            priority,
            enabled: true,
            config,
            success_rate,
            response_time_ms,
            circuit_breaker_open: false,
            consecutive_failures: 0,
            last_failure_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total order used by the priority source and by `GetAllProcessors`:
    /// ascending priority, ties broken by id.
    pub fn order_key(&self) -> (i32, Uuid) {
        (self.priority, self.id)
    }
}

/// Partial update applied atomically to one processor row.
#[derive(Debug, Default, Clone)]
pub struct ProcessorUpdate {
    pub enabled: Option<bool>,
    pub circuit_breaker_open: Option<bool>,
    pub consecutive_failures: Option<u32>,
    pub last_failure_time: Option<Option<DateTime<Utc>>>,
}
