// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Shopdesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level Shopdesk configuration.
///
/// Every section is optional and defaults to values suitable for a local
/// single-node deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShopdeskConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Input validation rules.
    #[serde(default)]
    pub query: QueryConfig,

    /// Per-user request quotas.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Failure thresholds for the rate limiter and LLM breakers.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Response cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Counter/cache store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Durable SQLite storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Usage analytics.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// HTTP gateway authentication and CORS.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// HTTP listener and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Capacity of the per-request event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_buffer() -> usize {
    32
}

/// Query validation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Maximum query length in characters.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Case-insensitive regular expressions that reject a query outright.
    #[serde(default = "default_blocked_patterns")]
    pub blocked_patterns: Vec<String>,

    /// Words that require an admin or superuser permission.
    #[serde(default = "default_sensitive_keywords")]
    pub sensitive_keywords: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_query_length: default_max_query_length(),
            blocked_patterns: default_blocked_patterns(),
            sensitive_keywords: default_sensitive_keywords(),
        }
    }
}

fn default_max_query_length() -> usize {
    1000
}

fn default_blocked_patterns() -> Vec<String> {
    [
        r"(delete|drop|truncate)\s+table",
        r"union\s+select",
        r"<script.*?>",
        r"javascript:",
        r"data:text/html",
        r"exec\s*\(",
        r"eval\s*\(",
        r"import\s+os",
        r"__import__",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_sensitive_keywords() -> Vec<String> {
    ["password", "secret", "token", "key", "credential"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Per-user quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u64,

    #[serde(default = "default_requests_per_hour")]
    pub requests_per_hour: u64,

    /// Upper bound on one primary (store-backed) check.
    #[serde(default = "default_primary_timeout_ms")]
    pub primary_timeout_ms: u64,

    /// Upper bound on one usage read.
    #[serde(default = "default_usage_timeout_ms")]
    pub usage_timeout_ms: u64,

    /// Request instants kept per key by the in-process fallback.
    #[serde(default = "default_fallback_capacity")]
    pub fallback_capacity: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            requests_per_hour: default_requests_per_hour(),
            primary_timeout_ms: default_primary_timeout_ms(),
            usage_timeout_ms: default_usage_timeout_ms(),
            fallback_capacity: default_fallback_capacity(),
        }
    }
}

fn default_requests_per_minute() -> u64 {
    10
}

fn default_requests_per_hour() -> u64 {
    100
}

fn default_primary_timeout_ms() -> u64 {
    5000
}

fn default_usage_timeout_ms() -> u64 {
    3000
}

fn default_fallback_capacity() -> usize {
    1000
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Consecutive store failures before the rate limiter switches to fallback.
    #[serde(default = "default_rate_limiter_failure_threshold")]
    pub rate_limiter_failure_threshold: u32,

    #[serde(default = "default_recovery_timeout_secs")]
    pub rate_limiter_recovery_secs: u64,

    /// Consecutive provider failures before classification or generation stop calling out.
    #[serde(default = "default_llm_failure_threshold")]
    pub llm_failure_threshold: u32,

    #[serde(default = "default_recovery_timeout_secs")]
    pub llm_recovery_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            rate_limiter_failure_threshold: default_rate_limiter_failure_threshold(),
            rate_limiter_recovery_secs: default_recovery_timeout_secs(),
            llm_failure_threshold: default_llm_failure_threshold(),
            llm_recovery_secs: default_recovery_timeout_secs(),
        }
    }
}

fn default_rate_limiter_failure_threshold() -> u32 {
    3
}

fn default_llm_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on one cache read or write.
    #[serde(default = "default_cache_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl_secs(),
            op_timeout_ms: default_cache_op_timeout_ms(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_op_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// LLM provider configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// API key. `None` requires the `OPENROUTER_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on 429 and 5xx responses.
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,

    /// Sent as `HTTP-Referer`.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Sent as `X-Title`.
    #[serde(default = "default_site_name")]
    pub site_name: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
            site_url: default_site_url(),
            site_name: default_site_name(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_model() -> String {
    "deepseek/deepseek-r1-0528:free".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_llm_max_retries() -> u32 {
    3
}

fn default_site_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_site_name() -> String {
    "Shopdesk Analytics".to_string()
}

/// Which backend holds counters, cached responses and analytics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Counter/cache store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Attempts for an optimistic counter transaction before giving up.
    #[serde(default = "default_transaction_retries")]
    pub transaction_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            transaction_retries: default_transaction_retries(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_transaction_retries() -> u32 {
    5
}

/// Durable storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("shopdesk").join("shopdesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("shopdesk.db"))
        .display()
        .to_string()
}

/// Usage analytics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Expiry of daily and per-user counters.
    #[serde(default = "default_daily_retention_days")]
    pub daily_retention_days: u64,

    /// Expiry of hourly counters.
    #[serde(default = "default_hourly_retention_days")]
    pub hourly_retention_days: u64,

    /// Execution-time samples kept in the rolling list.
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_retention_days: default_daily_retention_days(),
            hourly_retention_days: default_hourly_retention_days(),
            max_samples: default_max_samples(),
        }
    }
}

fn default_daily_retention_days() -> u64 {
    30
}

fn default_hourly_retention_days() -> u64 {
    7
}

fn default_max_samples() -> usize {
    1000
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bearer token required on every `/v1` request. `None` rejects all requests.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Allowed CORS origins. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}
