use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_SEOUL_API_BASE_URL: &str = "http://openapi.seoul.go.kr:8088";
const DEFAULT_COLLECT_CRON: &str = "0 0 3 * * *";

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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SEOULPET_ENV", "development"))?;
    let bind_addr = parse_addr("SEOULPET_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("SEOULPET_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("SEOULPET_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SEOULPET_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SEOULPET_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let seoul_api_base_url = or_default("SEOUL_API_BASE_URL", DEFAULT_SEOUL_API_BASE_URL);
    let seoul_api_key = lookup("SEOUL_API_KEY").ok().filter(|k| !k.trim().is_empty());

    let http_timeout_secs = parse_u64("SEOULPET_HTTP_TIMEOUT_SECS", "30")?;
    let http_max_connections = parse_usize("SEOULPET_HTTP_MAX_CONNECTIONS", "10")?;
    if http_max_connections == 0 {
        return Err(invalid(
            "SEOULPET_HTTP_MAX_CONNECTIONS",
            "must be at least 1".to_string(),
        ));
    }
    let http_max_idle_connections = parse_usize("SEOULPET_HTTP_MAX_IDLE_CONNECTIONS", "5")?;
    let http_user_agent = or_default(
        "SEOULPET_HTTP_USER_AGENT",
        "seoulpet/0.1 (open-data-collector)",
    );

    let collect_start = parse_u32("SEOULPET_COLLECT_START", "1")?;
    if collect_start == 0 {
        return Err(invalid(
            "SEOULPET_COLLECT_START",
            "row indices start at 1".to_string(),
        ));
    }
    let collect_end = parse_u32("SEOULPET_COLLECT_END", "1000")?;
    if collect_end < collect_start {
        return Err(invalid(
            "SEOULPET_COLLECT_END",
            format!("{collect_end} is before SEOULPET_COLLECT_START ({collect_start})"),
        ));
    }
    let collect_cron = Some(or_default("SEOULPET_COLLECT_CRON", DEFAULT_COLLECT_CRON))
        .filter(|c| !c.trim().is_empty());

    let api_keys = parse_api_keys(&or_default("SEOULPET_API_KEYS", ""));
    let rate_limit_max_requests = parse_usize("SEOULPET_RATE_LIMIT_MAX_REQUESTS", "120")?;
    if rate_limit_max_requests == 0 {
        return Err(invalid(
            "SEOULPET_RATE_LIMIT_MAX_REQUESTS",
            "must be at least 1".to_string(),
        ));
    }
    let rate_limit_window_secs = parse_u64("SEOULPET_RATE_LIMIT_WINDOW_SECS", "60")?;
    if rate_limit_window_secs == 0 {
        return Err(invalid(
            "SEOULPET_RATE_LIMIT_WINDOW_SECS",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        seoul_api_base_url,
        seoul_api_key,
        http_timeout_secs,
        http_max_connections,
        http_max_idle_connections,
        http_user_agent,
        collect_start,
        collect_end,
        collect_cron,
        api_keys,
        rate_limit_max_requests,
        rate_limit_window_secs,
    })
}

/// Splits a comma-separated token list, dropping blanks and duplicates.
fn parse_api_keys(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_owned());
        }
    }
    keys
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SEOULPET_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
