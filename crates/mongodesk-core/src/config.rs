//! Runtime configuration
//!
//! Read once at startup from built-in defaults, an optional TOML file, and
//! `MONGODESK_*` environment variables (highest precedence).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::security::{DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_MAX_QUERY_DEPTH, InputGate, SecretCodec};
use crate::{DialOptions, MongodeskError, Result};

/// Prefix for environment variables
pub const ENV_PREFIX: &str = "MONGODESK_";

/// Application configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeout for establishing a TCP connection to a server
    pub connect_timeout_ms: u64,
    /// Timeout for selecting a suitable server for an operation
    pub server_selection_timeout_ms: u64,
    /// Maximum pooled connections per cached client
    pub max_pool_size: u32,
    /// Idle time after which a cached client is evicted
    pub cache_ttl_ms: u64,
    /// Interval between expiry sweeps
    pub sweep_interval_ms: u64,
    /// Total dial attempts before giving up
    pub retry_attempts: u32,
    /// Delay before the second attempt; doubles each attempt
    pub retry_base_delay_ms: u64,
    /// Maximum query nesting depth
    pub max_query_depth: usize,
    /// Maximum serialized document size
    pub max_document_bytes: usize,
    /// Include raw error text in error envelopes
    pub debug_errors: bool,
    /// 32-byte key (64 hex chars or 32 raw bytes) for stored connection strings
    pub encryption_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            server_selection_timeout_ms: 30_000,
            max_pool_size: 10,
            cache_ttl_ms: 300_000,
            sweep_interval_ms: 60_000,
            retry_attempts: 3,
            retry_base_delay_ms: 1_000,
            max_query_depth: DEFAULT_MAX_QUERY_DEPTH,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            debug_errors: false,
            encryption_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML document and the process
    /// environment
    pub fn load(toml_source: Option<&str>) -> Result<Self> {
        Self::from_sources(toml_source, std::env::vars())
    }

    /// Load configuration from an optional TOML document and an explicit set
    /// of environment variables
    pub fn from_sources<I>(toml_source: Option<&str>, env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = match toml_source {
            Some(source) => toml::from_str::<AppConfig>(source).map_err(|e| {
                MongodeskError::Configuration(format!("Invalid configuration file: {}", e))
            })?,
            None => AppConfig::default(),
        };

        for (key, value) in env {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                config.apply_env(name, &value)?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "CONNECT_TIMEOUT_MS" => self.connect_timeout_ms = parse_env(name, value)?,
            "SERVER_SELECTION_TIMEOUT_MS" => {
                self.server_selection_timeout_ms = parse_env(name, value)?
            }
            "MAX_POOL_SIZE" => self.max_pool_size = parse_env(name, value)?,
            "CACHE_TTL_MS" => self.cache_ttl_ms = parse_env(name, value)?,
            "SWEEP_INTERVAL_MS" => self.sweep_interval_ms = parse_env(name, value)?,
            "RETRY_ATTEMPTS" => self.retry_attempts = parse_env(name, value)?,
            "RETRY_BASE_DELAY_MS" => self.retry_base_delay_ms = parse_env(name, value)?,
            "MAX_QUERY_DEPTH" => self.max_query_depth = parse_env(name, value)?,
            "MAX_DOCUMENT_BYTES" => self.max_document_bytes = parse_env(name, value)?,
            "DEBUG_ERRORS" => self.debug_errors = parse_env(name, value)?,
            "ENCRYPTION_KEY" => self.encryption_key = Some(value.to_string()),
            _ => tracing::debug!(variable = name, "ignoring unknown configuration variable"),
        }
        Ok(())
    }

    /// Reject values that would disable a safety property
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, bool); 6] = [
            ("cache_ttl_ms", self.cache_ttl_ms > 0),
            ("sweep_interval_ms", self.sweep_interval_ms > 0),
            ("retry_attempts", self.retry_attempts > 0),
            ("max_query_depth", self.max_query_depth > 0),
            ("max_document_bytes", self.max_document_bytes > 0),
            ("max_pool_size", self.max_pool_size > 0),
        ];

        for (field, ok) in checks {
            if !ok {
                return Err(MongodeskError::Configuration(format!(
                    "{} must be greater than 0",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Build the codec for stored connection strings. A missing or malformed
    /// key is fatal.
    pub fn secret_codec(&self) -> Result<SecretCodec> {
        let key = self.encryption_key.as_deref().ok_or_else(|| {
            MongodeskError::Configuration(format!(
                "{}ENCRYPTION_KEY must be set to a 32-byte key",
                ENV_PREFIX
            ))
        })?;
        SecretCodec::from_key_material(key)
    }

    pub fn input_gate(&self) -> InputGate {
        InputGate::new(self.max_query_depth, self.max_document_bytes)
    }

    pub fn dial_options(&self) -> DialOptions {
        DialOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            server_selection_timeout: Duration::from_millis(self.server_selection_timeout_ms),
            max_pool_size: self.max_pool_size,
            app_name: Some("mongodesk".to_string()),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("max_pool_size", &self.max_pool_size)
            .field("cache_ttl_ms", &self.cache_ttl_ms)
            .field("sweep_interval_ms", &self.sweep_interval_ms)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("max_query_depth", &self.max_query_depth)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("debug_errors", &self.debug_errors)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        MongodeskError::Configuration(format!(
            "{}{} has an invalid value",
            ENV_PREFIX, name
        ))
    })
}
