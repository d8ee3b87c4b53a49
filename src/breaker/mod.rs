//! Per-processor circuit breaker: closed/open/half-open, tracking
//! consecutive failures and last-failure time, keyed by processor id, with
//! one lock per processor so unrelated processors never contend.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::app::config::CircuitBreakerConfig;
use crate::models::ProcessorUpdate;
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerEntry {
    state: State,
    consecutive_failures: u32,
    last_failure_time: Option<chrono::DateTime<Utc>>,
}

impl BreakerEntry {
    fn new() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            last_failure_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub processor_id: Uuid,
    pub is_open: bool,
    pub consecutive_failures: u32,
}

/// Admission decision returned by `check`. `CircuitOpen` is not an error —
/// it is a routine "skip this candidate" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    CircuitOpen,
}

pub struct CircuitBreaker {
    entries: DashMap<Uuid, Mutex<BreakerEntry>>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            failure_threshold: config.failure_threshold,
            reset_timeout: config.reset_timeout,
        }
    }

    /// Admissibility check. May transition Open -> HalfOpen (speculative
    /// reset: the probe is let through, and its outcome decides the final
    /// state via `record_success`/`record_failure`).
    pub async fn check(&self, processor_id: Uuid, store: &dyn StateStore) -> Admission {
        let entry_lock = self
            .entries
            .entry(processor_id)
            .or_insert_with(|| Mutex::new(BreakerEntry::new()));

        let transitioned_to_half_open = {
            let mut entry = entry_lock.lock();
            match entry.state {
                State::Closed => return Admission::Admitted,
                State::HalfOpen => return Admission::Admitted,
                State::Open => {
                    let elapsed = entry
                        .last_failure_time
                        .map(|t| (Utc::now() - t).to_std().unwrap_or(Duration::ZERO))
                        .unwrap_or(Duration::MAX);

                    if elapsed >= self.reset_timeout {
                        entry.state = State::HalfOpen;
                        entry.consecutive_failures = 0;
                        true
                    } else {
                        return Admission::CircuitOpen;
                    }
                }
            }
        };

        if transitioned_to_half_open {
            let _ = store
                .update_processor(
                    processor_id,
                    ProcessorUpdate {
                        circuit_breaker_open: Some(false),
                        consecutive_failures: Some(0),
                        ..Default::default()
                    },
                )
                .await;
            Admission::Admitted
        } else {
            Admission::CircuitOpen
        }
    }

    pub async fn record_success(&self, processor_id: Uuid, store: &dyn StateStore) {
        let entry_lock = self
            .entries
            .entry(processor_id)
            .or_insert_with(|| Mutex::new(BreakerEntry::new()));
        {
            let mut entry = entry_lock.lock();
            entry.state = State::Closed;
            entry.consecutive_failures = 0;
            entry.last_failure_time = None;
        }

        let _ = store
            .update_processor(
                processor_id,
                ProcessorUpdate {
                    circuit_breaker_open: Some(false),
                    consecutive_failures: Some(0),
                    ..Default::default()
                },
            )
            .await;
    }

    pub async fn record_failure(&self, processor_id: Uuid, store: &dyn StateStore) {
        let entry_lock = self
            .entries
            .entry(processor_id)
            .or_insert_with(|| Mutex::new(BreakerEntry::new()));

        let (opened, failures, last_failure) = {
            let mut entry = entry_lock.lock();
            entry.consecutive_failures += 1;
            entry.last_failure_time = Some(Utc::now());

            if entry.consecutive_failures >= self.failure_threshold {
                entry.state = State::Open;
            }

            (
                entry.state == State::Open,
                entry.consecutive_failures,
                entry.last_failure_time,
            )
        };

        let _ = store
            .update_processor(
                processor_id,
                ProcessorUpdate {
                    circuit_breaker_open: Some(opened),
                    consecutive_failures: Some(failures),
                    last_failure_time: Some(last_failure),
                },
            )
            .await;
    }

    pub fn get_status(&self) -> Vec<BreakerStatus> {
        self.entries
            .iter()
            .map(|e| {
                let entry = e.value().lock();
                BreakerStatus {
                    processor_id: *e.key(),
                    is_open: entry.state == State::Open,
                    consecutive_failures: entry.consecutive_failures,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::CircuitBreakerConfig;
    use crate::models::{AdapterConfig, Processor};
    use crate::store::InMemoryStateStore;

    fn config(threshold: u32, reset_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout: Duration::from_millis(reset_ms),
            monitoring_window: Duration::from_secs(300),
        }
    }

    async fn seeded_store() -> (InMemoryStateStore, Uuid) {
        let store = InMemoryStateStore::new();
        let processor = Processor::new(
            "p1",
            "http",
            1,
            AdapterConfig::Simulated {
                success_rate: 1.0,
                latency_ms: 10,
            },
            99.0,
            50,
        );
        let id = processor.id;
        store.create_processor(processor).await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let (store, id) = seeded_store().await;
        let breaker = CircuitBreaker::new(&config(3, 60_000));

        for _ in 0..2 {
            assert_eq!(breaker.check(id, &store).await, Admission::Admitted);
            breaker.record_failure(id, &store).await;
        }
        assert_eq!(breaker.check(id, &store).await, Admission::Admitted);
        breaker.record_failure(id, &store).await;

        assert_eq!(breaker.check(id, &store).await, Admission::CircuitOpen);
        let processor = store.get_processor(id).await.unwrap().unwrap();
        assert!(processor.circuit_breaker_open);
        assert_eq!(processor.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn half_opens_after_reset_timeout_and_closes_on_success() {
        let (store, id) = seeded_store().await;
        let breaker = CircuitBreaker::new(&config(1, 1));

        breaker.record_failure(id, &store).await;
        assert_eq!(breaker.check(id, &store).await, Admission::CircuitOpen);

        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(breaker.check(id, &store).await, Admission::Admitted);
        breaker.record_success(id, &store).await;

        let processor = store.get_processor(id).await.unwrap().unwrap();
        assert!(!processor.circuit_breaker_open);
        assert_eq!(processor.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens_circuit() {
        let (store, id) = seeded_store().await;
        let breaker = CircuitBreaker::new(&config(1, 1));

        breaker.record_failure(id, &store).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(breaker.check(id, &store).await, Admission::Admitted);

        breaker.record_failure(id, &store).await;
        assert_eq!(breaker.check(id, &store).await, Admission::CircuitOpen);
    }
}
