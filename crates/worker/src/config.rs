use std::path::PathBuf;
use std::time::Duration;

use boxoffice_queue::WorkerOptions;

const DEFAULT_ARTIFACT_CONCURRENCY: usize = 5;
const DEFAULT_CONFIRMATION_CONCURRENCY: usize = 3;

/// Worker process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory ticket PDFs are written to and attached from.
    pub tickets_dir: PathBuf,
    pub artifact_concurrency: usize,
    pub confirmation_concurrency: usize,
    pub poll_interval: Duration,
    pub stalled_after: Duration,
    /// Budget for in-flight jobs after a shutdown signal.
    pub shutdown_timeout: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default    |
    /// |----------------------------|------------|
    /// | `TICKETS_DIR`              | `tickets`  |
    /// | `ARTIFACT_CONCURRENCY`     | `5`        |
    /// | `CONFIRMATION_CONCURRENCY` | `3`        |
    /// | `POLL_INTERVAL_MS`         | `500`      |
    /// | `STALLED_AFTER_SECS`       | `300`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`       |
    pub fn from_env() -> Self {
        Self {
            tickets_dir: std::env::var("TICKETS_DIR")
                .unwrap_or_else(|_| "tickets".into())
                .into(),
            artifact_concurrency: env_or("ARTIFACT_CONCURRENCY", DEFAULT_ARTIFACT_CONCURRENCY),
            confirmation_concurrency: env_or(
                "CONFIRMATION_CONCURRENCY",
                DEFAULT_CONFIRMATION_CONCURRENCY,
            ),
            poll_interval: Duration::from_millis(env_or("POLL_INTERVAL_MS", 500)),
            stalled_after: Duration::from_secs(env_or("STALLED_AFTER_SECS", 300)),
            shutdown_timeout: Duration::from_secs(env_or("SHUTDOWN_TIMEOUT_SECS", 30)),
        }
    }

    pub fn artifact_worker(&self) -> WorkerOptions {
        self.worker_options(self.artifact_concurrency)
    }

    pub fn confirmation_worker(&self) -> WorkerOptions {
        self.worker_options(self.confirmation_concurrency)
    }

    fn worker_options(&self, concurrency: usize) -> WorkerOptions {
        WorkerOptions {
            poll_interval: self.poll_interval,
            stalled_after: self.stalled_after,
            ..WorkerOptions::with_concurrency(concurrency)
        }
    }
}

/// Parse `key` or fall back to `default`.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
