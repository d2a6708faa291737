//! Service configuration.

use crate::error::{GeoQueryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result caps, fallback sizing and the indexed-path timeout.
///
/// Every field has a default, so an empty document is a valid configuration.
///
/// # Example
///
/// ```rust
/// use geoquery::Config;
/// use std::time::Duration;
///
/// let config = Config::default();
/// assert_eq!(config.radius_result_cap, 500);
///
/// let json = r#"{
///     "bounds_result_cap": 1000,
///     "indexed_timeout_ms": 250
/// }"#;
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.indexed_timeout(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum matches returned by a radius search.
    #[serde(default = "Config::default_radius_result_cap")]
    pub radius_result_cap: usize,

    /// Maximum matches returned by a bounds search.
    #[serde(default = "Config::default_bounds_result_cap")]
    pub bounds_result_cap: usize,

    /// Active rows the fallback path fetches per request.
    #[serde(default = "Config::default_fallback_working_set")]
    pub fallback_working_set: usize,

    /// Maximum cells returned by a cluster query.
    #[serde(default = "Config::default_cluster_cell_cap")]
    pub cluster_cell_cap: usize,

    /// Budget for the indexed attempt when the request carries no timeout.
    #[serde(default = "Config::default_indexed_timeout_ms")]
    pub indexed_timeout_ms: u64,

    /// Rows processed between cancellation checks on the fallback path.
    #[serde(default = "Config::default_scan_batch_size")]
    pub scan_batch_size: usize,
}

impl Config {
    const fn default_radius_result_cap() -> usize {
        500
    }

    const fn default_bounds_result_cap() -> usize {
        2000
    }

    const fn default_fallback_working_set() -> usize {
        2000
    }

    const fn default_cluster_cell_cap() -> usize {
        200
    }

    const fn default_indexed_timeout_ms() -> u64 {
        1500
    }

    const fn default_scan_batch_size() -> usize {
        256
    }

    pub fn with_radius_result_cap(mut self, cap: usize) -> Self {
        assert!(cap > 0, "Radius result cap must be greater than zero");
        self.radius_result_cap = cap;
        self
    }

    pub fn with_bounds_result_cap(mut self, cap: usize) -> Self {
        assert!(cap > 0, "Bounds result cap must be greater than zero");
        self.bounds_result_cap = cap;
        self
    }

    pub fn with_fallback_working_set(mut self, rows: usize) -> Self {
        assert!(rows > 0, "Fallback working set must be greater than zero");
        self.fallback_working_set = rows;
        self
    }

    pub fn with_cluster_cell_cap(mut self, cap: usize) -> Self {
        assert!(cap > 0, "Cluster cell cap must be greater than zero");
        self.cluster_cell_cap = cap;
        self
    }

    pub fn with_indexed_timeout(mut self, timeout: Duration) -> Self {
        self.indexed_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_scan_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "Scan batch size must be greater than zero");
        self.scan_batch_size = batch_size;
        self
    }

    pub fn indexed_timeout(&self) -> Duration {
        Duration::from_millis(self.indexed_timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("radius_result_cap", self.radius_result_cap),
            ("bounds_result_cap", self.bounds_result_cap),
            ("fallback_working_set", self.fallback_working_set),
            ("cluster_cell_cap", self.cluster_cell_cap),
            ("scan_batch_size", self.scan_batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(GeoQueryError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.indexed_timeout_ms == 0 {
            return Err(GeoQueryError::InvalidConfig(
                "indexed_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| GeoQueryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GeoQueryError::Serialization(e.to_string()))
    }

    /// Load configuration from a TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(toml_str).map_err(|e| GeoQueryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GeoQueryError::Serialization(e.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radius_result_cap: Self::default_radius_result_cap(),
            bounds_result_cap: Self::default_bounds_result_cap(),
            fallback_working_set: Self::default_fallback_working_set(),
            cluster_cell_cap: Self::default_cluster_cell_cap(),
            indexed_timeout_ms: Self::default_indexed_timeout_ms(),
            scan_batch_size: Self::default_scan_batch_size(),
        }
    }
}
