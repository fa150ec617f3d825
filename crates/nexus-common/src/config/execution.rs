//! Columnar execution configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE, MIN_BATCH_SIZE, UNLIMITED_MEMORY};
use crate::error::{NexusError, NexusResult};

/// Mode names accepted for `columnarizer_mode`.
pub const COLUMNARIZER_MODES: [&str; 2] = ["buffering", "streaming"];

/// Configuration for vectorized execution.
///
/// # Example
///
/// ```rust
/// use nexus_common::config::ColExecConfig;
///
/// let config = ColExecConfig::from_toml_str("batch_size = 256").unwrap();
/// assert_eq!(config.batch_size, 256);
/// assert_eq!(config.columnarizer_mode, "buffering");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColExecConfig {
    /// Maximum number of rows in a column batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Memory budget shared by all allocators of a flow, in bytes.
    /// Zero means unlimited.
    #[serde(default)]
    pub memory_limit_bytes: usize,

    /// Emit execution statistics as trailing metadata.
    #[serde(default)]
    pub collect_stats: bool,

    /// How row-to-column adapters batch their input.
    #[serde(default = "default_columnarizer_mode")]
    pub columnarizer_mode: String,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_columnarizer_mode() -> String {
    COLUMNARIZER_MODES[0].to_string()
}

impl Default for ColExecConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            memory_limit_bytes: UNLIMITED_MEMORY,
            collect_stats: false,
            columnarizer_mode: default_columnarizer_mode(),
        }
    }
}

impl ColExecConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for tests: small batches so that growth
    /// paths are exercised.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            batch_size: 4,
            collect_stats: true,
            ..Default::default()
        }
    }

    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> NexusResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> NexusResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> NexusResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| NexusError::invalid_config(format!("failed to serialize: {e}")))
    }

    /// Sets the maximum batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the memory budget.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Enables or disables statistics collection.
    #[must_use]
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.collect_stats = enabled;
        self
    }

    /// Sets the columnarizer mode by name.
    #[must_use]
    pub fn with_columnarizer_mode(mut self, mode: impl Into<String>) -> Self {
        self.columnarizer_mode = mode.into();
        self
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> NexusResult<()> {
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(NexusError::invalid_config(format!(
                "batch_size must be between {MIN_BATCH_SIZE} and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }

        if !COLUMNARIZER_MODES.contains(&self.columnarizer_mode.as_str()) {
            return Err(NexusError::invalid_config(format!(
                "unknown columnarizer_mode '{}'",
                self.columnarizer_mode
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ColExecConfig::default();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.memory_limit_bytes, UNLIMITED_MEMORY);
        assert!(!config.collect_stats);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = ColExecConfig::from_toml_str(
            r#"
            batch_size = 64
            memory_limit_bytes = 1048576
            collect_stats = true
            columnarizer_mode = "streaming"
            "#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.memory_limit_bytes, 1_048_576);
        assert!(config.collect_stats);
        assert_eq!(config.columnarizer_mode, "streaming");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ColExecConfig::for_testing().with_memory_limit(4096);
        let text = config.to_toml().unwrap();
        assert_eq!(ColExecConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = ColExecConfig::new().with_batch_size(0).validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));

        let err = ColExecConfig::new()
            .with_columnarizer_mode("eager")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("eager"));

        assert!(ColExecConfig::from_toml_str("batch_size = \"big\"").is_err());
    }
}
