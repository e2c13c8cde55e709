use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// URL of the raw outlet feed.
    pub source_url: String,
    pub source_timeout_secs: u64,
    /// Base URL of the structured-extraction service.
    pub extract_endpoint: String,
    pub extract_api_key: Option<String>,
    /// Per-batch timeout for extraction calls.
    pub extract_timeout_secs: u64,
    pub extract_max_retries: u32,
    pub extract_retry_backoff_ms: u64,
    pub normalize_stage_timeout_secs: u64,
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub overlap_threshold_km: f64,
    pub freshness_window_secs: u64,
    pub persist_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub distance_matrix_path: PathBuf,
}

impl AppConfig {
    #[must_use]
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("source_url", &self.source_url)
            .field("source_timeout_secs", &self.source_timeout_secs)
            .field("extract_endpoint", &self.extract_endpoint)
            .field(
                "extract_api_key",
                &self.extract_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("extract_timeout_secs", &self.extract_timeout_secs)
            .field("extract_max_retries", &self.extract_max_retries)
            .field("extract_retry_backoff_ms", &self.extract_retry_backoff_ms)
            .field(
                "normalize_stage_timeout_secs",
                &self.normalize_stage_timeout_secs,
            )
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_batches", &self.max_concurrent_batches)
            .field("overlap_threshold_km", &self.overlap_threshold_km)
            .field("freshness_window_secs", &self.freshness_window_secs)
            .field("persist_timeout_secs", &self.persist_timeout_secs)
            .field("shutdown_grace_secs", &self.shutdown_grace_secs)
            .field("distance_matrix_path", &self.distance_matrix_path)
            .finish()
    }
}
