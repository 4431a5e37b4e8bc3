use std::path::PathBuf;

use boxoffice_core::queue::{JobOptions, DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret, which must always be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on the post-shutdown drain in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Retry policy attached to every ticket job this server enqueues.
    pub job_options: JobOptions,
    /// Directory the worker renders ticket PDFs into (default: `tickets`).
    pub tickets_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `QUEUE_MAX_ATTEMPTS`   | `3`                        |
    /// | `QUEUE_BACKOFF_MS`     | `1000`                     |
    /// | `TICKETS_DIR`          | `tickets`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();
        let job_options = job_options_from_env();
        let tickets_dir = PathBuf::from(
            std::env::var("TICKETS_DIR").unwrap_or_else(|_| "tickets".into()),
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            job_options,
            tickets_dir,
        }
    }
}

fn job_options_from_env() -> JobOptions {
    let max_attempts: i32 = std::env::var("QUEUE_MAX_ATTEMPTS")
        .unwrap_or_else(|_| DEFAULT_MAX_ATTEMPTS.to_string())
        .parse()
        .expect("QUEUE_MAX_ATTEMPTS must be a valid i32");
    assert!(max_attempts >= 1, "QUEUE_MAX_ATTEMPTS must be at least 1");

    let backoff_ms: i64 = std::env::var("QUEUE_BACKOFF_MS")
        .unwrap_or_else(|_| DEFAULT_BACKOFF_BASE_MS.to_string())
        .parse()
        .expect("QUEUE_BACKOFF_MS must be a valid i64");

    JobOptions {
        max_attempts,
        backoff_ms,
    }
}
