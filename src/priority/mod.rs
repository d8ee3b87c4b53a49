//! Supplies the ordered candidate list to the routing engine. Two
//! implementations behind one trait: a local source reading the state
//! store directly, and an oracle wrapper that tries an external endpoint
//! first and falls back to its inner source on any failure. This spec
//! adopts "advisory with fallback" uniformly — the engine cannot tell
//! whether a given list came from the oracle or the fallback, and neither
//! can the caller; both are equally authoritative for one routing pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::StateStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub processor_id: Uuid,
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrioritySourceKind {
    Local,
    OracleFresh,
    OracleFallback,
}

#[async_trait]
pub trait PrioritySource: Send + Sync {
    /// Ordered ascending by `priority`. Only `enabled` processors are
    /// candidates at this layer — circuit admissibility is NOT filtered
    /// here, it is re-checked by the engine per candidate per iteration,
    /// so a processor whose circuit just half-opened still gets a probe.
    async fn get_priorities(&self) -> Vec<PriorityEntry>;

    fn kind(&self) -> PrioritySourceKind;
}

pub struct LocalPrioritySource {
    store: Arc<dyn StateStore>,
}

impl LocalPrioritySource {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PrioritySource for LocalPrioritySource {
    async fn get_priorities(&self) -> Vec<PriorityEntry> {
        match self.store.get_all_processors().await {
            Ok(processors) => processors
                .into_iter()
                .filter(|p| p.enabled)
                .map(|p| PriorityEntry {
                    processor_id: p.id,
                    name: p.name,
                    priority: p.priority,
                    enabled: p.enabled,
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn kind(&self) -> PrioritySourceKind {
        PrioritySourceKind::Local
    }
}

/// Wraps an inner source with an optional external oracle fetch. The
/// oracle's own endpoints (e.g. smart-contract deployment, blockchain
/// round metadata) are out of scope — only the fallback contract matters
/// here: on timeout, parse error, or an empty result, fall back to the
/// inner source and log why.
pub struct OraclePrioritySource {
    inner: Arc<dyn PrioritySource>,
    client: reqwest::Client,
    oracle_url: Option<String>,
    timeout: Duration,
    /// Whether the most recent `get_priorities()` call was actually served
    /// fresh from the oracle, as opposed to the fallback inner source.
    /// `kind()` reports this, not just whether a URL is configured.
    last_call_was_fresh: AtomicBool,
}

impl OraclePrioritySource {
    pub fn new(inner: Arc<dyn PrioritySource>, oracle_url: Option<String>) -> Self {
        Self {
            inner,
            client: reqwest::Client::new(),
            oracle_url,
            timeout: Duration::from_secs(2),
            last_call_was_fresh: AtomicBool::new(false),
        }
    }

    async fn fetch_oracle(&self, url: &str) -> Result<Vec<PriorityEntry>, String> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let entries: Vec<PriorityEntry> = response.json().await.map_err(|e| e.to_string())?;

        if entries.is_empty() {
            return Err("oracle returned an empty priority list".to_string());
        }

        Ok(entries)
    }
}

#[async_trait]
impl PrioritySource for OraclePrioritySource {
    async fn get_priorities(&self) -> Vec<PriorityEntry> {
        let Some(url) = &self.oracle_url else {
            self.last_call_was_fresh.store(false, Ordering::SeqCst);
            return self.inner.get_priorities().await;
        };

        match self.fetch_oracle(url).await {
            Ok(mut entries) => {
                entries.sort_by_key(|e| e.priority);
                self.last_call_was_fresh.store(true, Ordering::SeqCst);
                entries
            }
            Err(reason) => {
                tracing::error!(reason = %reason, "priority oracle unavailable, using fallback list");
                self.last_call_was_fresh.store(false, Ordering::SeqCst);
                self.inner.get_priorities().await
            }
        }
    }

    /// Reflects the outcome of the most recent `get_priorities()` call, not
    /// merely whether a URL is configured — a request served by fallback
    /// must report `OracleFallback` even with an oracle URL present.
    fn kind(&self) -> PrioritySourceKind {
        if self.oracle_url.is_none() {
            return PrioritySourceKind::OracleFallback;
        }
        if self.last_call_was_fresh.load(Ordering::SeqCst) {
            PrioritySourceKind::OracleFresh
        } else {
            PrioritySourceKind::OracleFallback
        }
    }
}
