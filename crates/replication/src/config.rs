//! Tailing configuration via `marklog.toml`
//!
//! Settings that apply to every tailing call of a [`crate::WalAccess`]:
//! the barrier lease length, checksum verification, and the node-local
//! collections that are never replicated.

use marklog_core::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name placed next to the log directory.
pub const CONFIG_FILE_NAME: &str = "marklog.toml";

/// Collections that hold node-local state and are never replicated.
pub const DEFAULT_EXCLUDED_COLLECTIONS: &[&str] = &[
    "_statistics*",
    "_routing",
    "_sessions",
    "_frontend",
    "_configuration",
];

fn default_barrier_ttl_secs() -> u64 {
    180
}

fn default_verify_checksums() -> bool {
    true
}

fn default_excluded_collections() -> Vec<String> {
    DEFAULT_EXCLUDED_COLLECTIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Tailing configuration loaded from `marklog.toml`.
///
/// # Example
///
/// ```toml
/// # Seconds a tail call extends its barrier by
/// barrier_ttl_secs = 180
///
/// # Verify marker checksums while decoding
/// verify_checksums = true
///
/// # Never-replicated collections; a trailing * matches a prefix
/// excluded_collections = ["_statistics*", "_routing"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailConfig {
    /// Barrier lease length in seconds, used when a tail call names a barrier.
    #[serde(default = "default_barrier_ttl_secs")]
    pub barrier_ttl_secs: u64,
    /// Verify the CRC32 of every marker.
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,
    /// Collection names (or `prefix*` patterns) excluded from replication.
    #[serde(default = "default_excluded_collections")]
    pub excluded_collections: Vec<String>,
}

impl Default for TailConfig {
    fn default() -> Self {
        TailConfig {
            barrier_ttl_secs: default_barrier_ttl_secs(),
            verify_checksums: default_verify_checksums(),
            excluded_collections: default_excluded_collections(),
        }
    }
}

impl TailConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the barrier lease length (builder pattern).
    pub fn with_barrier_ttl_secs(mut self, secs: u64) -> Self {
        self.barrier_ttl_secs = secs;
        self
    }

    /// Enable or disable checksum verification (builder pattern).
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Replace the exclusion list (builder pattern).
    pub fn with_excluded_collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_collections = names.into_iter().map(Into::into).collect();
        self
    }

    /// Barrier lease length.
    pub fn barrier_ttl(&self) -> Duration {
        Duration::from_secs(self.barrier_ttl_secs)
    }

    /// Whether a collection name is on the exclusion list.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_collections
            .iter()
            .any(|pattern| match pattern.strip_suffix('*') {
                Some(prefix) => name.starts_with(prefix),
                None => name == pattern,
            })
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.barrier_ttl_secs == 0 {
            return Err(ConfigError::ZeroBarrierTtl);
        }
        for pattern in &self.excluded_collections {
            let name = pattern.strip_suffix('*').unwrap_or(pattern);
            if name.is_empty() {
                return Err(ConfigError::EmptyExclusion);
            }
            if !marklog_core::is_system_name(name) {
                return Err(ConfigError::NotASystemCollection(pattern.clone()));
            }
        }
        Ok(())
    }

    /// Create a configuration for tests: short barrier lease.
    pub fn for_testing() -> Self {
        TailConfig {
            barrier_ttl_secs: 5,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TailConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# marklog tailing configuration
#
# Seconds a tail call extends the caller's barrier by (default: 180)
barrier_ttl_secs = 180

# Verify marker CRC32 checksums while decoding (default: true)
verify_checksums = true

# Node-local collections that are never replicated.
# A trailing * matches every collection starting with the prefix.
excluded_collections = ["_statistics*", "_routing", "_sessions", "_frontend", "_configuration"]
"#
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Barrier lease of zero seconds
    #[error("barrier_ttl_secs must be at least 1")]
    ZeroBarrierTtl,

    /// Exclusion entry with no name
    #[error("excluded_collections entries must not be empty")]
    EmptyExclusion,

    /// Exclusion entry that does not name a system collection
    #[error("excluded collection '{0}' is not a system collection")]
    NotASystemCollection(String),

    /// TOML could not be parsed or produced
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Config file could not be read or written
    #[error("Config file '{path}': {message}")]
    Io {
        /// File path
        path: String,
        /// Underlying I/O error
        message: String,
    },
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::config(e.to_string())
    }
}
