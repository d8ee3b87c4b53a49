use std::env;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

/// Command-line overrides layered on top of the environment. Config is
/// still env-first, the same as the rest of this repo's settings; the CLI
/// only exists for the two knobs operators commonly want at launch time.
#[derive(Debug, Parser)]
#[command(name = "payment-waterfall", about = "Waterfall payment router")]
pub struct Cli {
    /// Override PORT.
    #[arg(long)]
    pub port: Option<u16>,

    /// Print the resolved configuration and exit without starting the server.
    #[arg(long)]
    pub config_check: bool,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    /// Reserved: accepted for compatibility but not consulted by the
    /// breaker's consecutive-failure counting (see DESIGN.md).
    pub monitoring_window: Duration,
}

#[derive(Debug, Clone)]
pub struct ProcessorSeed {
    pub name: String,
    pub processor_type: String,
    pub priority: i32,
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub log_level: Level,
    pub circuit_breaker: CircuitBreakerConfig,
    pub allowed_origins: Vec<String>,
    pub processor_seeds: Vec<ProcessorSeed>,
    pub priority_oracle_url: Option<String>,
    pub push_interval: Duration,
    pub adapter_call_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = match env_or("LOG_LEVEL", "info").to_lowercase().as_str() {
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let processor_seeds = vec![
            ProcessorSeed {
                name: "default".to_string(),
                processor_type: "default".to_string(),
                priority: 1,
                base_url: env_or("DEFAULT_PROCESSOR_URL", "http://payment-processor-default:8080"),
                token: env_or("TOKEN", "123"),
            },
            ProcessorSeed {
                name: "fallback".to_string(),
                processor_type: "fallback".to_string(),
                priority: 2,
                base_url: env_or("FALLBACK_PROCESSOR_URL", "http://payment-processor-fallback:8080"),
                token: env_or("TOKEN", "123"),
            },
        ];

        Self {
            server_port: env_parse("PORT", 9999u16),
            log_level,
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env_parse("CIRCUIT_BREAKER_FAILURE_THRESHOLD", 3),
                reset_timeout: Duration::from_millis(env_parse(
                    "CIRCUIT_BREAKER_RESET_TIMEOUT",
                    60_000,
                )),
                monitoring_window: Duration::from_millis(env_parse(
                    "CIRCUIT_BREAKER_MONITORING_WINDOW",
                    300_000,
                )),
            },
            allowed_origins,
            processor_seeds,
            priority_oracle_url: env::var("PRIORITY_ORACLE_URL").ok(),
            push_interval: Duration::from_millis(env_parse("PUSH_INTERVAL_MS", 1_000)),
            adapter_call_timeout: Duration::from_millis(env_parse("ADAPTER_TIMEOUT_MS", 5_000)),
        }
    }

    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(port) = cli.port {
            self.server_port = port;
        }
        self
    }
}
