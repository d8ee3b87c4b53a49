use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;
use uuid::Uuid;

use crate::models::log::{LogLevel, SystemLog};

/// Forwards every event at or above the configured level into the state
/// store's system log table, without blocking the hot path: the layer
/// only pushes onto an unbounded channel, a background task owns the
/// actual store write (see `logging::spawn_store_log_sink`).
pub struct StoreLogLayer {
    sender: UnboundedSender<SystemLog>,
    /// Least-verbose level accepted; e.g. `Level::INFO` passes info/warn/error.
    level_cap: tracing::Level,
}

impl StoreLogLayer {
    pub fn new(sender: UnboundedSender<SystemLog>, level_cap: tracing::Level) -> Self {
        Self { sender, level_cap }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    transaction_id: Option<Uuid>,
    processor_id: Option<Uuid>,
    fields: Map<String, Value>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        self.capture(field.name(), rendered);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.capture(field.name(), value.to_string());
    }
}

impl FieldVisitor {
    fn capture(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = Some(value),
            "transaction_id" => self.transaction_id = Uuid::parse_str(value.trim_matches('"')).ok(),
            "processor_id" => self.processor_id = Uuid::parse_str(value.trim_matches('"')).ok(),
            other => {
                self.fields.insert(other.to_string(), Value::String(value));
            }
        }
    }
}

impl<S: Subscriber> Layer<S> for StoreLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > self.level_cap {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let log = SystemLog {
            id: Uuid::new_v4(),
            level: LogLevel::from_tracing(&level),
            message: visitor.message.unwrap_or_default(),
            service: event.metadata().target().to_string(),
            transaction_id: visitor.transaction_id,
            processor_id: visitor.processor_id,
            metadata: Value::Object(visitor.fields),
            timestamp: Utc::now(),
        };

        let _ = self.sender.send(log);
    }
}
