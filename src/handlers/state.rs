use std::sync::Arc;
use std::time::Duration;

use crate::adapters::AdapterRegistry;
use crate::breaker::CircuitBreaker;
use crate::engine::RoutingEngine;
use crate::health::HealthAggregator;
use crate::priority::PrioritySource;
use crate::push::PushBroadcaster;
use crate::store::StateStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub engine: Arc<RoutingEngine>,
    pub health: Arc<HealthAggregator>,
    pub registry: Arc<AdapterRegistry>,
    pub priority_source: Arc<dyn PrioritySource>,
    pub breaker: Arc<CircuitBreaker>,
    pub push: Arc<PushBroadcaster>,
    pub adapter_call_timeout: Duration,
}
