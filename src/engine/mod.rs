//! Orchestrates the waterfall: iterate the priority list, consult the
//! circuit breaker, invoke the adapter, record the outcome. Tries
//! processors in priority order and stops at first success, same as a
//! two-step "primary then fallback" routing, generalized to an
//! arbitrary-length priority list with per-step breaker/registry/adapter
//! lookups.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::{AdapterError, AdapterRegistry};
use crate::app::error::AppError;
use crate::breaker::{Admission, CircuitBreaker};
use crate::models::health::HealthMetric;
use crate::models::transaction::{PaymentRequest, RoutingResult, Transaction, TransactionStatus};
use crate::priority::PrioritySource;
use crate::store::StateStore;
use crate::utils::money::Money;

pub struct RoutingEngine {
    store: Arc<dyn StateStore>,
    breaker: Arc<CircuitBreaker>,
    registry: Arc<AdapterRegistry>,
    priority_source: Arc<dyn PrioritySource>,
    adapter_call_timeout: Duration,
}

impl RoutingEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        breaker: Arc<CircuitBreaker>,
        registry: Arc<AdapterRegistry>,
        priority_source: Arc<dyn PrioritySource>,
        adapter_call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            breaker,
            registry,
            priority_source,
            adapter_call_timeout,
        }
    }

    fn validate(request: &PaymentRequest) -> Result<(Money, String), AppError> {
        let amount = Money::parse(&request.amount)
            .map_err(|e| AppError::Validation(format!("invalid amount: {e}")))?;

        let currency = if request.currency.is_empty() {
            "USD".to_string()
        } else {
            request.currency.clone()
        };

        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(AppError::Validation(format!(
                "currency must be a 3-letter ISO code, got {currency:?}"
            )));
        }

        Ok((amount, currency))
    }

    /// `deadline` is the caller's implicit budget for the whole call; `None`
    /// means no deadline, the default.
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
        deadline: Option<Duration>,
    ) -> Result<RoutingResult, AppError> {
        let started = Instant::now();
        let deadline_at = deadline.map(|d| started + d);

        let (amount, currency) = Self::validate(&request)?;
        let metadata: Value = request.metadata;

        let mut transaction = Transaction::new_pending(amount, currency.clone(), metadata.clone());
        self.store
            .create_transaction(transaction.clone())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let candidates = self.priority_source.get_priorities().await;

        if candidates.is_empty() {
            return self
                .finalize_failed(&mut transaction, started, "no payment processors available")
                .await;
        }

        for candidate in &candidates {
            if let Some(deadline_at) = deadline_at {
                if Instant::now() >= deadline_at {
                    let reason = format!(
                        "deadline exceeded after {} attempts",
                        transaction.attempted_processors.len()
                    );
                    return self.finalize_failed(&mut transaction, started, &reason).await;
                }
            }

            let processor = match self.store.get_processor(candidate.processor_id).await {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "store error reading processor during routing");
                    continue;
                }
            };

            if !processor.enabled {
                warn!(processor = %processor.name, "processor disabled mid-call, skipping");
                continue;
            }

            if self.breaker.check(processor.id, self.store.as_ref()).await == Admission::CircuitOpen
            {
                warn!(processor = %processor.name, "circuit open, skipping");
                continue;
            }

            transaction.attempted_processors.push(processor.name.clone());

            let Some(adapter) = self.registry.get(&processor.processor_type) else {
                error!(processor_type = %processor.processor_type, "no adapter registered for processor type");
                continue;
            };

            let remaining = deadline_at
                .map(|at| at.saturating_duration_since(Instant::now()))
                .unwrap_or(self.adapter_call_timeout);
            let call_budget = remaining.min(self.adapter_call_timeout);

            let call_started = Instant::now();
            let adapter_for_call = adapter.clone();
            let amount_for_call = transaction.amount;
            let currency_for_call = currency.clone();
            let metadata_for_call = metadata.clone();

            let mut call = tokio::spawn(async move {
                adapter_for_call
                    .process_payment(&amount_for_call, &currency_for_call, &metadata_for_call)
                    .await
            });

            let outcome = match tokio::time::timeout(call_budget, &mut call).await {
                Ok(Ok(Ok(outcome))) => Ok(outcome),
                Ok(Ok(Err(adapter_err))) => Err(adapter_err),
                Ok(Err(join_err)) => {
                    return self
                        .finalize_system_error(&mut transaction, started, &join_err.to_string())
                        .await;
                }
                Err(_elapsed) => {
                    call.abort();
                    Err(AdapterError::Fault("adapter call timed out".to_string()))
                }
            };

            let latency_ms = call_started.elapsed().as_millis() as u64;

            match outcome {
                Ok(outcome) => {
                    self.breaker.record_success(processor.id, self.store.as_ref()).await;
                    let total = self.store.get_total_transaction_count().await.unwrap_or(0);
                    let _ = self
                        .store
                        .create_health_metric(HealthMetric::success(processor.id, latency_ms, total))
                        .await;

                    info!(processor = %processor.name, transaction_id = %transaction.id, "payment succeeded");

                    transaction.status = TransactionStatus::Success;
                    transaction.processor_id = Some(processor.id);
                    transaction.processor_transaction_id = Some(outcome.transaction_id);
                    transaction.processing_time_ms = Some(started.elapsed().as_millis() as u64);
                    transaction.updated_at = chrono::Utc::now();

                    if let Err(e) = self.store.update_transaction(transaction.clone()).await {
                        error!(error = %e, transaction_id = %transaction.id, "degraded: failed to persist final transaction state");
                    }

                    return Ok(RoutingResult {
                        success: true,
                        transaction: transaction.clone(),
                        processor_used: Some(processor.name.clone()),
                        attempted_processors: transaction.attempted_processors.clone(),
                        total_processing_time_ms: transaction.processing_time_ms.unwrap_or(0),
                    });
                }
                Err(adapter_err) => {
                    self.breaker.record_failure(processor.id, self.store.as_ref()).await;
                    let total = self.store.get_total_transaction_count().await.unwrap_or(0);
                    let _ = self
                        .store
                        .create_health_metric(HealthMetric::failure(processor.id, latency_ms, total))
                        .await;

                    match &adapter_err {
                        AdapterError::Declined { message, .. } => {
                            warn!(processor = %processor.name, reason = %message, "processor declined payment");
                        }
                        AdapterError::Fault(message) => {
                            error!(processor = %processor.name, reason = %message, "adapter call failed");
                        }
                    }
                }
            }
        }

        self.finalize_failed(&mut transaction, started, "all payment processors failed")
            .await
    }

    async fn finalize_failed(
        &self,
        transaction: &mut Transaction,
        started: Instant,
        reason: &str,
    ) -> Result<RoutingResult, AppError> {
        transaction.status = TransactionStatus::Failed;
        transaction.failure_reason = Some(reason.to_string());
        transaction.processing_time_ms = Some(started.elapsed().as_millis() as u64);
        transaction.updated_at = chrono::Utc::now();

        if let Err(e) = self.store.update_transaction(transaction.clone()).await {
            error!(error = %e, transaction_id = %transaction.id, "degraded: failed to persist final transaction state");
        }

        Err(AppError::Declined {
            reason: reason.to_string(),
            attempted_processors: transaction.attempted_processors.clone(),
            processing_time_ms: transaction.processing_time_ms.unwrap_or(0),
            transaction_id: transaction.id,
        })
    }

    async fn finalize_system_error(
        &self,
        transaction: &mut Transaction,
        started: Instant,
        message: &str,
    ) -> Result<RoutingResult, AppError> {
        let reason = format!("system error: {message}");
        transaction.status = TransactionStatus::Failed;
        transaction.failure_reason = Some(reason.clone());
        transaction.processing_time_ms = Some(started.elapsed().as_millis() as u64);
        transaction.updated_at = chrono::Utc::now();

        error!(transaction_id = %transaction.id, reason = %reason, "engine-internal failure");
        let _ = self.store.update_transaction(transaction.clone()).await;

        Err(AppError::System(reason))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use proptest::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::adapters::simulated::SimulatedAdapter;
    use crate::adapters::{AdapterHealth, AdapterPaymentOutcome, ProcessorAdapter};
    use crate::app::config::CircuitBreakerConfig;
    use crate::models::AdapterConfig;
    use crate::priority::LocalPrioritySource;
    use crate::store::InMemoryStateStore;

    fn breaker_config(threshold: u32, reset_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout: Duration::from_millis(reset_ms),
            monitoring_window: Duration::from_secs(300),
        }
    }

    fn request(amount: &str) -> PaymentRequest {
        PaymentRequest {
            amount: amount.to_string(),
            currency: "USD".to_string(),
            metadata: json!({}),
        }
    }

    /// Adapter whose outcome can be flipped mid-test, for scenarios that
    /// need a processor to fail and then recover (S2-S4).
    struct ToggleAdapter {
        succeeds: AtomicBool,
    }

    impl ToggleAdapter {
        fn new(succeeds: bool) -> Self {
            Self {
                succeeds: AtomicBool::new(succeeds),
            }
        }

        fn set_succeeds(&self, value: bool) {
            self.succeeds.store(value, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl ProcessorAdapter for ToggleAdapter {
        async fn process_payment(
            &self,
            _amount: &Money,
            _currency: &str,
            _metadata: &Value,
        ) -> Result<AdapterPaymentOutcome, AdapterError> {
            if self.succeeds.load(Ordering::SeqCst) {
                Ok(AdapterPaymentOutcome {
                    transaction_id: Uuid::new_v4().to_string(),
                    processing_time_ms: 1,
                })
            } else {
                Err(AdapterError::Declined {
                    message: "toggle adapter declined".to_string(),
                    code: None,
                })
            }
        }

        async fn health_check(&self) -> AdapterHealth {
            AdapterHealth {
                healthy: self.succeeds.load(Ordering::SeqCst),
                response_time_ms: 1,
                error: None,
            }
        }
    }

    /// Sleeps far longer than the call budget, then flips `completed` if it
    /// ever finishes. Used to prove a timed-out call is actually aborted
    /// rather than left running detached.
    struct SlowAdapter {
        sleep: Duration,
        completed: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl ProcessorAdapter for SlowAdapter {
        async fn process_payment(
            &self,
            _amount: &Money,
            _currency: &str,
            _metadata: &Value,
        ) -> Result<AdapterPaymentOutcome, AdapterError> {
            tokio::time::sleep(self.sleep).await;
            self.completed.store(true, Ordering::SeqCst);
            Ok(AdapterPaymentOutcome {
                transaction_id: Uuid::new_v4().to_string(),
                processing_time_ms: self.sleep.as_millis() as u64,
            })
        }

        async fn health_check(&self) -> AdapterHealth {
            AdapterHealth {
                healthy: true,
                response_time_ms: 1,
                error: None,
            }
        }
    }

    fn make_processor(name: &str, processor_type: &str, priority: i32) -> Processor {
        Processor::new(
            name,
            processor_type,
            priority,
            AdapterConfig::Simulated {
                success_rate: 1.0,
                latency_ms: 1,
            },
            99.0,
            10,
        )
    }

    async fn harness(
        p1_adapter: Arc<dyn ProcessorAdapter>,
        p2_adapter: Arc<dyn ProcessorAdapter>,
        threshold: u32,
        reset_ms: u64,
    ) -> (RoutingEngine, Arc<dyn StateStore>, Processor, Processor) {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let p1 = make_processor("P1", "p1", 1);
        let p2 = make_processor("P2", "p2", 2);
        store.create_processor(p1.clone()).await.unwrap();
        store.create_processor(p2.clone()).await.unwrap();

        let mut adapters: HashMap<String, Arc<dyn ProcessorAdapter>> = HashMap::new();
        adapters.insert("p1".to_string(), p1_adapter);
        adapters.insert("p2".to_string(), p2_adapter);
        let registry = Arc::new(AdapterRegistry::from_map(adapters));

        let breaker = Arc::new(CircuitBreaker::new(&breaker_config(threshold, reset_ms)));
        let priority_source: Arc<dyn PrioritySource> = Arc::new(LocalPrioritySource::new(store.clone()));
        let engine = RoutingEngine::new(store.clone(), breaker, registry, priority_source, Duration::from_secs(5));

        (engine, store, p1, p2)
    }

    #[tokio::test]
    async fn s1_happy_path_through_primary() {
        let (engine, _store, p1, _p2) = harness(
            Arc::new(SimulatedAdapter::always_succeeds()),
            Arc::new(SimulatedAdapter::always_succeeds()),
            3,
            60_000,
        )
        .await;

        let result = engine.process_payment(request("10.00"), None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.processor_used.as_deref(), Some(p1.name.as_str()));
        assert_eq!(result.attempted_processors, vec![p1.name.clone()]);
        assert_eq!(result.transaction.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn s2_waterfall_to_secondary() {
        let (engine, store, p1, p2) = harness(
            Arc::new(ToggleAdapter::new(false)),
            Arc::new(SimulatedAdapter::always_succeeds()),
            3,
            60_000,
        )
        .await;

        let result = engine.process_payment(request("10.00"), None).await.unwrap();

        assert_eq!(result.processor_used.as_deref(), Some(p2.name.as_str()));
        assert_eq!(result.attempted_processors, vec![p1.name.clone(), p2.name.clone()]);

        let p1_after = store.get_processor(p1.id).await.unwrap().unwrap();
        assert_eq!(p1_after.consecutive_failures, 1);
        assert!(!p1_after.circuit_breaker_open);
    }

    #[tokio::test]
    async fn s3_circuit_opens_after_threshold() {
        let (engine, store, p1, p2) = harness(
            Arc::new(ToggleAdapter::new(false)),
            Arc::new(SimulatedAdapter::always_succeeds()),
            3,
            60_000,
        )
        .await;

        for expected_failures in 1..=3u32 {
            let result = engine.process_payment(request("10.00"), None).await.unwrap();
            assert!(result.attempted_processors.contains(&p1.name));

            let p1_after = store.get_processor(p1.id).await.unwrap().unwrap();
            assert_eq!(p1_after.consecutive_failures, expected_failures);
        }

        let p1_after = store.get_processor(p1.id).await.unwrap().unwrap();
        assert!(p1_after.circuit_breaker_open);

        let fourth = engine.process_payment(request("10.00"), None).await.unwrap();
        assert!(!fourth.attempted_processors.contains(&p1.name));
        assert_eq!(fourth.processor_used.as_deref(), Some(p2.name.as_str()));
    }

    #[tokio::test]
    async fn s4_circuit_half_opens_after_cooldown() {
        let p1_adapter = Arc::new(ToggleAdapter::new(false));
        let (engine, store, p1, _p2) = harness(
            p1_adapter.clone(),
            Arc::new(SimulatedAdapter::always_succeeds()),
            1,
            10,
        )
        .await;

        engine.process_payment(request("10.00"), None).await.unwrap();
        let p1_after = store.get_processor(p1.id).await.unwrap().unwrap();
        assert!(p1_after.circuit_breaker_open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        p1_adapter.set_succeeds(true);

        let result = engine.process_payment(request("10.00"), None).await.unwrap();
        assert_eq!(result.processor_used.as_deref(), Some(p1.name.as_str()));

        let p1_final = store.get_processor(p1.id).await.unwrap().unwrap();
        assert!(!p1_final.circuit_breaker_open);
        assert_eq!(p1_final.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn s5_all_processors_fail() {
        let (engine, _store, p1, p2) = harness(
            Arc::new(ToggleAdapter::new(false)),
            Arc::new(ToggleAdapter::new(false)),
            3,
            60_000,
        )
        .await;

        let err = engine.process_payment(request("10.00"), None).await.unwrap_err();
        match err {
            AppError::Declined {
                reason,
                attempted_processors,
                ..
            } => {
                assert_eq!(reason, "all payment processors failed");
                assert_eq!(attempted_processors, vec![p1.name.clone(), p2.name.clone()]);
            }
            other => panic!("expected Declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn s6_operator_toggle_mid_stream_skips_processor() {
        let (engine, store, p1, p2) = harness(
            Arc::new(SimulatedAdapter::always_succeeds()),
            Arc::new(SimulatedAdapter::always_succeeds()),
            3,
            60_000,
        )
        .await;

        store
            .update_processor(
                p1.id,
                crate::models::ProcessorUpdate {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = engine.process_payment(request("10.00"), None).await.unwrap();
        assert!(!result.attempted_processors.contains(&p1.name));
        assert_eq!(result.processor_used.as_deref(), Some(p2.name.as_str()));
    }

    #[tokio::test]
    async fn adapter_call_timeout_aborts_task_and_advances_to_next_candidate() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let p1 = make_processor("P1", "p1", 1);
        let p2 = make_processor("P2", "p2", 2);
        store.create_processor(p1.clone()).await.unwrap();
        store.create_processor(p2.clone()).await.unwrap();

        let p1_completed = Arc::new(AtomicBool::new(false));
        let mut adapters: HashMap<String, Arc<dyn ProcessorAdapter>> = HashMap::new();
        adapters.insert(
            "p1".to_string(),
            Arc::new(SlowAdapter {
                sleep: Duration::from_secs(5),
                completed: p1_completed.clone(),
            }),
        );
        adapters.insert("p2".to_string(), Arc::new(SimulatedAdapter::always_succeeds()));
        let registry = Arc::new(AdapterRegistry::from_map(adapters));

        let breaker = Arc::new(CircuitBreaker::new(&breaker_config(3, 60_000)));
        let priority_source: Arc<dyn PrioritySource> = Arc::new(LocalPrioritySource::new(store.clone()));
        let engine = RoutingEngine::new(
            store.clone(),
            breaker,
            registry,
            priority_source,
            Duration::from_millis(20),
        );

        let result = engine.process_payment(request("10.00"), None).await.unwrap();
        assert_eq!(result.processor_used.as_deref(), Some(p2.name.as_str()));
        assert_eq!(result.attempted_processors, vec![p1.name.clone(), p2.name.clone()]);

        let p1_after = store.get_processor(p1.id).await.unwrap().unwrap();
        assert_eq!(p1_after.consecutive_failures, 1);

        // Give the aborted task a chance to run if it wasn't actually
        // cancelled; it must never reach the line that sets `completed`.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!p1_completed.load(Ordering::SeqCst));
    }

    proptest! {
        /// I1: attemptedProcessors never exceeds the number of candidates that
        /// were enabled with a closed circuit at the start of the call.
        #[test]
        fn i1_attempted_processors_bounded_by_admissible_candidates(
            p1_enabled in any::<bool>(),
            p2_enabled in any::<bool>(),
            p1_succeeds in any::<bool>(),
            p2_succeeds in any::<bool>(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (engine, store, p1, p2) = harness(
                    Arc::new(ToggleAdapter::new(p1_succeeds)),
                    Arc::new(ToggleAdapter::new(p2_succeeds)),
                    3,
                    60_000,
                )
                .await;

                let mut admissible = 0;
                if !p1_enabled {
                    store
                        .update_processor(p1.id, crate::models::ProcessorUpdate { enabled: Some(false), ..Default::default() })
                        .await
                        .unwrap();
                } else {
                    admissible += 1;
                }
                if !p2_enabled {
                    store
                        .update_processor(p2.id, crate::models::ProcessorUpdate { enabled: Some(false), ..Default::default() })
                        .await
                        .unwrap();
                } else {
                    admissible += 1;
                }

                let outcome = engine.process_payment(request("10.00"), None).await;
                let attempted_len = match outcome {
                    Ok(result) => result.attempted_processors.len(),
                    Err(AppError::Declined { attempted_processors, .. }) => attempted_processors.len(),
                    Err(other) => panic!("unexpected error variant: {other:?}"),
                };

                prop_assert!(attempted_len <= admissible);
                Ok(())
            })?;
        }
    }
}
