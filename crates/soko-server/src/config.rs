use serde::Serialize;
use soko_query::CatalogLimits;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub sql_timeout: Duration,
    pub slow_query_threshold: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024,
            request_timeout: Duration::from_secs(5),
            sql_timeout: Duration::from_millis(800),
            slow_query_threshold: Duration::from_millis(200),
        }
    }
}

pub fn validate_startup_config_contract(
    api: &ApiConfig,
    store: &crate::StoreConfig,
    limits: &CatalogLimits,
) -> Result<(), String> {
    if api.max_body_bytes == 0 {
        return Err("api body limit must be > 0".to_string());
    }
    if api.request_timeout.is_zero() || api.sql_timeout.is_zero() {
        return Err("timeouts must be > 0".to_string());
    }
    if api.sql_timeout >= api.request_timeout {
        return Err("sql timeout must be shorter than the request timeout".to_string());
    }
    if store.max_read_connections == 0 {
        return Err("store read pool must allow at least one connection".to_string());
    }
    if store.retry.max_attempts == 0 {
        return Err("store retry policy must allow at least one attempt".to_string());
    }
    if limits.default_page_size == 0 || limits.default_page_size > limits.max_page_size {
        return Err("default page size must fall within 1..=max page size".to_string());
    }
    if limits.default_similar == 0 || limits.default_similar > limits.max_similar {
        return Err("default similar limit must fall within 1..=max similar limit".to_string());
    }
    Ok(())
}
