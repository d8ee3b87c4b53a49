pub mod health;
pub mod log;
pub mod processor;
pub mod transaction;

pub use health::HealthMetric;
pub use log::{LogLevel, SystemLog};
pub use processor::{AdapterConfig, Processor, ProcessorUpdate};
pub use transaction::{PaymentRequest, RoutingResult, Transaction, TransactionStatus};
