//! One `reqwest::Client` per configured HTTP backend, POSTing
//! `{base_url}/payments` with an `X-Rinha-Token`-style header and GETing
//! `{base_url}/health`.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::utils::money::Money;

use super::{AdapterError, AdapterHealth, AdapterPaymentOutcome, ProcessorAdapter};

#[derive(Serialize)]
struct ProcessorPayload<'a> {
    #[serde(rename = "correlationId")]
    correlation_id: Uuid,
    amount: String,
    #[serde(rename = "requestedAt")]
    requested_at: u64,
    metadata: &'a serde_json::Value,
}

pub struct HttpProcessorAdapter {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpProcessorAdapter {
    pub fn new(base_url: String, token: String, call_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(call_timeout)
            .build()
            .expect("failed to build HTTP client for processor adapter");

        Self {
            client,
            base_url,
            token,
        }
    }

    /// Joins `path` onto the configured base URL. Falls back to plain
    /// concatenation if `base_url` was never a well-formed URL, so a
    /// misconfigured processor still fails at the request, not at startup.
    fn endpoint(&self, path: &str) -> String {
        match url::Url::parse(&self.base_url) {
            Ok(base) => base
                .join(path)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| format!("{}/{}", self.base_url, path)),
            Err(_) => format!("{}/{}", self.base_url, path),
        }
    }
}

#[async_trait]
impl ProcessorAdapter for HttpProcessorAdapter {
    async fn process_payment(
        &self,
        amount: &Money,
        _currency: &str,
        metadata: &serde_json::Value,
    ) -> Result<AdapterPaymentOutcome, AdapterError> {
        let started = Instant::now();
        let requested_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let payload = ProcessorPayload {
            correlation_id: Uuid::new_v4(),
            amount: amount.to_string(),
            requested_at,
            metadata,
        };

        let response = self
            .client
            .post(self.endpoint("payments"))
            .header("Content-Type", "application/json")
            .header("X-Rinha-Token", &self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AdapterError::Fault(e.to_string()))?;

        let processing_time_ms = started.elapsed().as_millis() as u64;

        if response.status().is_success() {
            Ok(AdapterPaymentOutcome {
                transaction_id: payload.correlation_id.to_string(),
                processing_time_ms,
            })
        } else if response.status().is_client_error() {
            Err(AdapterError::Declined {
                message: format!("processor returned HTTP {}", response.status()),
                code: Some(response.status().as_str().to_string()),
            })
        } else {
            Err(AdapterError::Fault(format!(
                "processor returned HTTP {}",
                response.status()
            )))
        }
    }

    async fn health_check(&self) -> AdapterHealth {
        let started = Instant::now();
        match self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => AdapterHealth {
                healthy: true,
                response_time_ms: started.elapsed().as_millis() as u64,
                error: None,
            },
            Ok(response) => AdapterHealth {
                healthy: false,
                response_time_ms: started.elapsed().as_millis() as u64,
                error: Some(format!("HTTP {}", response.status())),
            },
            Err(e) => AdapterHealth {
                healthy: false,
                response_time_ms: started.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
            },
        }
    }
}
