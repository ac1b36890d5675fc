//! Configuration system for graphclean.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GraphCleanError, GraphCleanResult};
use crate::traits::{GraphStoreConfig, GraphStoreProvider};

/// Retry policy for transient store errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: 2.0_f32,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Main resolution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Graph store connection.
    pub store: GraphStoreConfig,
    /// Retry policy for transient store failures.
    pub retry: RetryPolicy,
    /// Timeout for a single store operation (milliseconds).
    pub operation_timeout_ms: u64,
    /// Maximum in-flight store operations during fan-out.
    pub max_concurrency: usize,
    /// Minimum similarity (0-100) for a fuzzy taxonomy match.
    pub fuzzy_threshold: f64,
    /// Suffix used by the lexical variant merger.
    pub plural_suffix: String,
    /// Maximum examples listed per section in a rendered report.
    pub report_limit: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            store: GraphStoreConfig::default(),
            retry: RetryPolicy::default(),
            operation_timeout_ms: 30_000,
            max_concurrency: 8,
            fuzzy_threshold: 85.0,
            plural_suffix: "s".to_string(),
            report_limit: 20,
        }
    }
}

impl ResolutionConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> GraphCleanResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| GraphCleanError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GraphCleanError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GraphCleanError::Configuration(e.to_string()))?,
            _ => {
                return Err(GraphCleanError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> GraphCleanResult<Self> {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("GRAPHCLEAN_STORE_PROVIDER") {
            config.store.provider = GraphStoreProvider::parse(&provider)?;
        }
        if let Ok(url) = std::env::var("GRAPHCLEAN_STORE_URL") {
            config.store.url = url;
        }
        if let Ok(username) = std::env::var("GRAPHCLEAN_STORE_USERNAME") {
            config.store.username = Some(username);
        }
        if let Ok(password) = std::env::var("GRAPHCLEAN_STORE_PASSWORD") {
            config.store.password = Some(password);
        }
        if let Ok(database) = std::env::var("GRAPHCLEAN_STORE_DATABASE") {
            config.store.database = Some(database);
        }

        if let Some(v) = env_parse("GRAPHCLEAN_MAX_RETRIES")? {
            config.retry.max_retries = v;
        }
        if let Some(v) = env_parse("GRAPHCLEAN_OPERATION_TIMEOUT_MS")? {
            config.operation_timeout_ms = v;
        }
        if let Some(v) = env_parse("GRAPHCLEAN_MAX_CONCURRENCY")? {
            config.max_concurrency = v;
        }
        if let Some(v) = env_parse("GRAPHCLEAN_FUZZY_THRESHOLD")? {
            config.fuzzy_threshold = v;
        }
        if let Ok(suffix) = std::env::var("GRAPHCLEAN_PLURAL_SUFFIX") {
            config.plural_suffix = suffix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> GraphCleanResult<()> {
        if self.max_concurrency == 0 {
            return Err(GraphCleanError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(GraphCleanError::Configuration(format!(
                "fuzzy_threshold must be within 0..=100, got {}",
                self.fuzzy_threshold
            )));
        }
        if self.plural_suffix.is_empty() {
            return Err(GraphCleanError::Configuration(
                "plural_suffix must not be empty".to_string(),
            ));
        }
        if self.operation_timeout_ms == 0 {
            return Err(GraphCleanError::Configuration(
                "operation_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ResolutionConfigBuilder {
        ResolutionConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> GraphCleanResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GraphCleanError::Configuration(format!("{} has an invalid value: {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}

/// Builder for ResolutionConfig.
#[derive(Default)]
pub struct ResolutionConfigBuilder {
    config: ResolutionConfig,
}

impl ResolutionConfigBuilder {
    /// Set graph store configuration.
    pub fn store(mut self, store: GraphStoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Set retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn operation_timeout_ms(mut self, ms: u64) -> Self {
        self.config.operation_timeout_ms = ms;
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.max_concurrency = n;
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.config.fuzzy_threshold = threshold;
        self
    }

    pub fn plural_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.plural_suffix = suffix.into();
        self
    }

    pub fn report_limit(mut self, limit: usize) -> Self {
        self.config.report_limit = limit;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> GraphCleanResult<ResolutionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
