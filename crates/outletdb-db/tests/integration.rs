//! Offline unit tests for outletdb-db pool configuration and row types.
//! These tests do not require a live database connection.

use outletdb_core::{AppConfig, Environment, Outlet};
use outletdb_db::{OutletRow, OverlapRow, PoolConfig, ReplaceCounts};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        source_url: "http://source.test/outlets.json".to_string(),
        source_timeout_secs: 30,
        extract_endpoint: "http://extract.test".to_string(),
        extract_api_key: None,
        extract_timeout_secs: 120,
        extract_max_retries: 2,
        extract_retry_backoff_ms: 1000,
        normalize_stage_timeout_secs: 600,
        batch_size: 50,
        max_concurrent_batches: 4,
        overlap_threshold_km: 5.0,
        freshness_window_secs: 86_400,
        persist_timeout_secs: 60,
        shutdown_grace_secs: 30,
        distance_matrix_path: PathBuf::from("./data/distance_matrix.csv"),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn outlet_row_converts_to_core_outlet() {
    let id = Uuid::new_v4();
    let row = OutletRow {
        id,
        name: "Subway Mid Valley".to_string(),
        address: Some("Lingkaran Syed Putra".to_string()),
        latitude: None,
        longitude: 101.677,
        operating_hours: Some("Monday 08:00 - 22:00".to_string()),
        waze_link: "https://waze.com/ul/hw283".to_string(),
    };

    let outlet = Outlet::from(row);
    assert_eq!(outlet.id, id);
    assert_eq!(outlet.name, "Subway Mid Valley");
    assert!(outlet.coordinates().is_none());
}

#[test]
fn overlap_row_exposes_edge() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let row = OverlapRow {
        id: 1,
        outlet1_id: a,
        outlet1_name: "A".to_string(),
        outlet2_id: b,
        outlet2_name: "B".to_string(),
        distance: 0.157,
    };

    let edge = row.edge();
    assert_eq!(edge.other(a), Some(b));
    assert!((edge.distance_km - 0.157).abs() < f64::EPSILON);
}

#[test]
fn replace_counts_default_is_zero() {
    let counts = ReplaceCounts::default();
    assert_eq!(counts.outlets + counts.edges + counts.schedules + counts.deleted, 0);
}
