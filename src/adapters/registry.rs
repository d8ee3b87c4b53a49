//! Built at process start from processor configurations: keyed by `type`,
//! holding one adapter instance per configured backend. The engine looks
//! up by `processor.processor_type`; a missing mapping is a hard
//! configuration error but does not poison the rest of the routing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{AdapterConfig, Processor};

use super::http::HttpProcessorAdapter;
use super::simulated::SimulatedAdapter;
use super::ProcessorAdapter;

pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ProcessorAdapter>>,
}

impl AdapterRegistry {
    /// One adapter per distinct `processor_type` seen in `processors`; the
    /// adapter is constructed from that processor's first occurrence of
    /// `config`. No real payment-acquirer integration exists behind
    /// `ApiKey`/`ClientCredentials`/`AppId`/`Merchant` configs (out of
    /// scope per spec); they resolve to a simulated adapter so the
    /// contract is still exercised end to end.
    pub fn build(processors: &[Processor], call_timeout: Duration) -> Self {
        let mut adapters = HashMap::new();

        for processor in processors {
            adapters
                .entry(processor.processor_type.clone())
                .or_insert_with(|| adapter_from_config(&processor.config, call_timeout));
        }

        Self { adapters }
    }

    pub fn get(&self, processor_type: &str) -> Option<Arc<dyn ProcessorAdapter>> {
        self.adapters.get(processor_type).cloned()
    }

    /// Builds a registry directly from a prepared map, bypassing
    /// `build`'s one-config-per-type inference. Used by tests that need
    /// fine-grained control over which adapter backs which processor type.
    pub fn from_map(adapters: HashMap<String, Arc<dyn ProcessorAdapter>>) -> Self {
        Self { adapters }
    }
}

fn adapter_from_config(config: &AdapterConfig, call_timeout: Duration) -> Arc<dyn ProcessorAdapter> {
    match config {
        AdapterConfig::Http { base_url, token } => Arc::new(HttpProcessorAdapter::new(
            base_url.clone(),
            token.clone(),
            call_timeout,
        )),
        AdapterConfig::Simulated {
            success_rate,
            latency_ms,
        } => Arc::new(SimulatedAdapter::new(*success_rate, *latency_ms)),
        AdapterConfig::ApiKey { .. }
        | AdapterConfig::ClientCredentials { .. }
        | AdapterConfig::AppId { .. }
        | AdapterConfig::Merchant { .. } => Arc::new(SimulatedAdapter::new(0.95, 50)),
    }
}
