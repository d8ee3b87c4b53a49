pub mod store_layer;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::store::StateStore;
use store_layer::StoreLogLayer;

/// Structured sink: stdout formatted (via `tracing_subscriber::fmt`) plus
/// an async write to the state store's log table. Initializes the global
/// subscriber once; returns the background task handle that drains the
/// store-bound channel so callers can await it at shutdown if desired.
pub fn init(log_level: tracing::Level, store: Arc<dyn StateStore>) -> tokio::task::JoinHandle<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(StoreLogLayer::new(tx, log_level))
        .init();

    tokio::spawn(async move {
        while let Some(log) = rx.recv().await {
            if let Err(e) = store.create_system_log(log).await {
                eprintln!("failed to persist system log: {e}");
            }
        }
    })
}
