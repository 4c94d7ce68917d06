//! Offline unit tests for seoulpet-db pool configuration and row types.
//! These tests do not require a live database connection.

use seoulpet_core::{AppConfig, Environment, PetClinic, PetRegistration, WeatherObservation};
use seoulpet_db::{upsert_sql, CollectionRunRow, Destination, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

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
        seoul_api_base_url: "http://openapi.seoul.go.kr:8088".to_string(),
        seoul_api_key: None,
        http_timeout_secs: 30,
        http_max_connections: 10,
        http_max_idle_connections: 5,
        http_user_agent: "ua".to_string(),
        collect_start: 1,
        collect_end: 1000,
        collect_cron: None,
        api_keys: Vec::new(),
        rate_limit_max_requests: 120,
        rate_limit_window_secs: 60,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CollectionRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn collection_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CollectionRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cli".to_string(),
        status: "running".to_string(),
        range_start: 1,
        range_end: 1000,
        total_collected: 0,
        total_saved: 0,
        summary: None,
        error_message: None,
        started_at: Utc::now(),
        completed_at: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.trigger_source, "cli");
    assert_eq!(row.status, "running");
    assert!(row.completed_at.is_none());
    assert!(row.summary.is_none());
}

#[test]
fn destinations_name_their_tables() {
    assert_eq!(PetRegistration::TABLE, "pet_registrations");
    assert_eq!(PetClinic::TABLE, "pet_clinics");
    assert_eq!(WeatherObservation::TABLE, "weather_observations");
}

#[test]
fn clinic_upsert_keys_on_management_number() {
    let sql = upsert_sql(PetClinic::TABLE, PetClinic::COLUMNS, PetClinic::CONFLICT_KEY);
    assert!(sql.starts_with("INSERT INTO pet_clinics (mgt_no, name,"));
    assert!(sql.contains("ON CONFLICT (mgt_no) DO UPDATE SET name = EXCLUDED.name"));
    assert!(sql.ends_with("updated_at = NOW()"));
}
