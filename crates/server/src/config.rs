use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Tunables for the game session service.
#[derive(Clone, Copy, Debug)]
pub struct GameSettings {
    /// Time each player starts with.
    pub clock_budget: Duration,
    /// Added to the mover's clock after every accepted move.
    pub clock_increment: Duration,
    /// Longest wait for a per-match lock before the call counts as unavailable.
    pub lock_timeout: Duration,
    /// Total attempts for an operation hitting transient store faults.
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            clock_budget: Duration::from_secs(600),
            clock_increment: Duration::ZERO,
            lock_timeout: Duration::from_millis(5000),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres URL. Matches live in memory when unset.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub game: GameSettings,
    pub clock_scan_interval: Duration,
    pub clock_scan_limit: i64,
    pub sqs_queue_url: Option<String>,
    pub sqs_endpoint_url: Option<String>,
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = GameSettings::default();
        Self {
            database_url: optional("DATABASE_URL"),
            jwt_secret: env::var("JWT_SECRET_KEY")
                .unwrap_or_else(|_| "dev-secret-key-change-in-production".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 8000),
            game: GameSettings {
                clock_budget: Duration::from_secs(parsed(
                    "CLOCK_BUDGET_SECS",
                    defaults.clock_budget.as_secs(),
                )),
                clock_increment: Duration::from_secs(parsed(
                    "CLOCK_INCREMENT_SECS",
                    defaults.clock_increment.as_secs(),
                )),
                lock_timeout: Duration::from_millis(parsed("LOCK_TIMEOUT_MS", 5000)),
                retry_attempts: parsed("STORE_RETRY_ATTEMPTS", defaults.retry_attempts).max(1),
                retry_backoff: Duration::from_millis(parsed("STORE_RETRY_BACKOFF_MS", 50)),
            },
            clock_scan_interval: Duration::from_millis(parsed("CLOCK_SCAN_INTERVAL_MS", 1000)),
            clock_scan_limit: parsed("CLOCK_SCAN_LIMIT", 500),
            sqs_queue_url: optional("SQS_QUEUE_URL"),
            sqs_endpoint_url: optional("SQS_ENDPOINT_URL"),
        }
    }

    /// Settings for running the service in-process without any environment.
    pub fn local(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            game: GameSettings::default(),
            clock_scan_interval: Duration::from_millis(1000),
            clock_scan_limit: 500,
            sqs_queue_url: None,
            sqs_endpoint_url: None,
        }
    }
}
