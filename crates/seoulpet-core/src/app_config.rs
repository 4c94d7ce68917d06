use std::net::SocketAddr;

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

/// Process-wide settings, built once at startup by [`crate::load_app_config`]
/// and handed to every component that needs them.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub seoul_api_base_url: String,
    pub seoul_api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub http_max_connections: usize,
    pub http_max_idle_connections: usize,
    pub http_user_agent: String,
    /// First row index (1-based, inclusive) requested from each source.
    pub collect_start: u32,
    /// Last row index (inclusive) requested from each source.
    pub collect_end: u32,
    /// Six-field cron expression for the scheduled batch; `None` disables it.
    pub collect_cron: Option<String>,
    /// Bearer tokens accepted by the HTTP API. Empty disables auth in development.
    pub api_keys: Vec<String>,
    /// Requests allowed per [`AppConfig::rate_limit_window_secs`] on protected routes.
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
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
            .field("seoul_api_base_url", &self.seoul_api_base_url)
            .field(
                "seoul_api_key",
                &self.seoul_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_max_connections", &self.http_max_connections)
            .field("http_max_idle_connections", &self.http_max_idle_connections)
            .field("http_user_agent", &self.http_user_agent)
            .field("collect_start", &self.collect_start)
            .field("collect_end", &self.collect_end)
            .field("collect_cron", &self.collect_cron)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .finish()
    }
}
