use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files. Use it in tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.into(),
    }
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| invalid(var, e.to_string()))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value: usize = parse_as(var, &or_default(var, default))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1"));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let source_url = require("OUTLETDB_SOURCE_URL")?;
    let extract_endpoint = require("OUTLETDB_EXTRACT_ENDPOINT")?;
    let extract_api_key = lookup("OUTLETDB_EXTRACT_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());

    let env = parse_environment(&or_default("OUTLETDB_ENV", "development"))?;

    let bind_addr: SocketAddr =
        parse_as("OUTLETDB_BIND_ADDR", &or_default("OUTLETDB_BIND_ADDR", "0.0.0.0:3000"))?;
    let log_level = or_default("OUTLETDB_LOG_LEVEL", "info");

    let db_max_connections: u32 = parse_as(
        "OUTLETDB_DB_MAX_CONNECTIONS",
        &or_default("OUTLETDB_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "OUTLETDB_DB_MIN_CONNECTIONS",
        &or_default("OUTLETDB_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_as(
        "OUTLETDB_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("OUTLETDB_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let source_timeout_secs: u64 = parse_as(
        "OUTLETDB_SOURCE_TIMEOUT_SECS",
        &or_default("OUTLETDB_SOURCE_TIMEOUT_SECS", "30"),
    )?;

    let extract_timeout_secs: u64 = parse_as(
        "OUTLETDB_EXTRACT_TIMEOUT_SECS",
        &or_default("OUTLETDB_EXTRACT_TIMEOUT_SECS", "120"),
    )?;
    let extract_max_retries: u32 = parse_as(
        "OUTLETDB_EXTRACT_MAX_RETRIES",
        &or_default("OUTLETDB_EXTRACT_MAX_RETRIES", "2"),
    )?;
    let extract_retry_backoff_ms: u64 = parse_as(
        "OUTLETDB_EXTRACT_RETRY_BACKOFF_MS",
        &or_default("OUTLETDB_EXTRACT_RETRY_BACKOFF_MS", "1000"),
    )?;
    let normalize_stage_timeout_secs: u64 = parse_as(
        "OUTLETDB_NORMALIZE_STAGE_TIMEOUT_SECS",
        &or_default("OUTLETDB_NORMALIZE_STAGE_TIMEOUT_SECS", "600"),
    )?;

    let batch_size = positive_usize("OUTLETDB_BATCH_SIZE", "50")?;
    let max_concurrent_batches = positive_usize("OUTLETDB_MAX_CONCURRENT_BATCHES", "4")?;

    let overlap_threshold_km: f64 = parse_as(
        "OUTLETDB_OVERLAP_THRESHOLD_KM",
        &or_default("OUTLETDB_OVERLAP_THRESHOLD_KM", "5.0"),
    )?;
    if !overlap_threshold_km.is_finite() || overlap_threshold_km <= 0.0 {
        return Err(invalid(
            "OUTLETDB_OVERLAP_THRESHOLD_KM",
            "must be a positive number of kilometers",
        ));
    }

    let freshness_window_secs: u64 = parse_as(
        "OUTLETDB_FRESHNESS_WINDOW_SECS",
        &or_default("OUTLETDB_FRESHNESS_WINDOW_SECS", "86400"),
    )?;
    if freshness_window_secs == 0 {
        return Err(invalid("OUTLETDB_FRESHNESS_WINDOW_SECS", "must be at least 1"));
    }
    let persist_timeout_secs: u64 = parse_as(
        "OUTLETDB_PERSIST_TIMEOUT_SECS",
        &or_default("OUTLETDB_PERSIST_TIMEOUT_SECS", "60"),
    )?;
    let shutdown_grace_secs: u64 = parse_as(
        "OUTLETDB_SHUTDOWN_GRACE_SECS",
        &or_default("OUTLETDB_SHUTDOWN_GRACE_SECS", "30"),
    )?;
    let distance_matrix_path = PathBuf::from(or_default(
        "OUTLETDB_DISTANCE_MATRIX_PATH",
        "./data/distance_matrix.csv",
    ));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        source_url,
        source_timeout_secs,
        extract_endpoint,
        extract_api_key,
        extract_timeout_secs,
        extract_max_retries,
        extract_retry_backoff_ms,
        normalize_stage_timeout_secs,
        batch_size,
        max_concurrent_batches,
        overlap_threshold_km,
        freshness_window_secs,
        persist_timeout_secs,
        shutdown_grace_secs,
        distance_matrix_path,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "OUTLETDB_ENV",
            format!("expected development, test, or production; got {other:?}"),
        )),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
