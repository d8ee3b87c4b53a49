mod adapters;
mod app;
mod breaker;
mod engine;
mod handlers;
mod health;
mod logging;
mod models;
mod priority;
mod push;
mod store;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use adapters::AdapterRegistry;
use app::config::{Cli, Config};
use breaker::CircuitBreaker;
use clap::Parser;
use engine::RoutingEngine;
use health::HealthAggregator;
use models::{AdapterConfig, Processor};
use priority::{LocalPrioritySource, OraclePrioritySource, PrioritySource};
use push::{PushBroadcaster, PushKind};
use serde_json::json;
use store::{InMemoryStateStore, StateStore};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().apply_cli(&cli);

    let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());

    let _log_sink = logging::init(config.log_level, store.clone());

    if cli.config_check {
        println!("{config:#?}");
        return Ok(());
    }

    info!(port = config.server_port, "starting payment waterfall router");

    seed_processors(&config, &store).await?;

    let breaker = Arc::new(CircuitBreaker::new(&config.circuit_breaker));

    let all_processors = store.get_all_processors().await?;
    let registry = Arc::new(AdapterRegistry::build(&all_processors, config.adapter_call_timeout));

    let local_source = Arc::new(LocalPrioritySource::new(store.clone()));
    let priority_source: Arc<dyn PrioritySource> = Arc::new(OraclePrioritySource::new(
        local_source,
        config.priority_oracle_url.clone(),
    ));

    let routing_engine = Arc::new(RoutingEngine::new(
        store.clone(),
        breaker.clone(),
        registry.clone(),
        priority_source.clone(),
        config.adapter_call_timeout,
    ));

    let health_aggregator = Arc::new(HealthAggregator::new(
        store.clone(),
        breaker.clone(),
        priority_source.clone(),
    ));

    let push_broadcaster = Arc::new(PushBroadcaster::new());

    let state = handlers::AppState {
        store: store.clone(),
        engine: routing_engine,
        health: health_aggregator.clone(),
        registry,
        priority_source,
        breaker,
        push: push_broadcaster.clone(),
        adapter_call_timeout: config.adapter_call_timeout,
    };

    tokio::spawn(push_ticker(
        push_broadcaster,
        state.store.clone(),
        health_aggregator,
        config.push_interval,
    ));

    let app = handlers::build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Seeds the default/fallback HTTP processors from environment-derived
/// config, as data rows rather than hardcoded match arms.
async fn seed_processors(config: &Config, store: &Arc<dyn StateStore>) -> anyhow::Result<()> {
    for seed in &config.processor_seeds {
        let processor = Processor::new(
            seed.name.clone(),
            seed.processor_type.clone(),
            seed.priority,
            AdapterConfig::Http {
                base_url: seed.base_url.clone(),
                token: seed.token.clone(),
            },
            99.0,
            50,
        );
        store.create_processor(processor).await?;
    }
    Ok(())
}

/// Every tick, publishes `metrics`, `transactions`, and `health` to every
/// live subscriber.
async fn push_ticker(
    broadcaster: Arc<PushBroadcaster>,
    store: Arc<dyn StateStore>,
    health_aggregator: Arc<HealthAggregator>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        if let Ok(stats) = store.get_system_stats().await {
            broadcaster.publish(PushKind::Metrics, json!(stats));
        }

        if let Ok(transactions) = store.get_transactions(20, 0).await {
            broadcaster.publish(PushKind::Transactions, json!({ "transactions": transactions }));
        }

        if let Ok(snapshot) = health_aggregator.snapshot().await {
            broadcaster.publish(PushKind::Health, json!(snapshot));
        }
    }
}
