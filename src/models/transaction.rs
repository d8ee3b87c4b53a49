use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::utils::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

/// One routing attempt, created `pending` and finalized exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: Money,
    pub currency: String,
    pub status: TransactionStatus,
    pub processor_id: Option<Uuid>,
    pub processor_transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub processing_time_ms: Option<u64>,
    pub attempted_processors: Vec<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new_pending(amount: Money, currency: String, metadata: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            amount,
            currency,
            status: TransactionStatus::Pending,
            processor_id: None,
            processor_transaction_id: None,
            failure_reason: None,
            processing_time_ms: None,
            attempted_processors: Vec::new(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Caller-supplied payment request, pre-validation.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub metadata: Value,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Outcome of one `ProcessPayment` call, independent of its HTTP framing.
#[derive(Debug, Clone)]
pub struct RoutingResult {
    pub success: bool,
    pub transaction: Transaction,
    pub processor_used: Option<String>,
    pub attempted_processors: Vec<String>,
    pub total_processing_time_ms: u64,
}
