//! Console configuration
//!
//! Loaded from TOML; every key is optional and falls back to its default.
//!
//! ```toml
//! success_window_ms = 3000
//! log_filter = "info,cfg_console=debug"
//! log_json = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default success-indicator window
pub const DEFAULT_SUCCESS_WINDOW: Duration = Duration::from_secs(3);

/// Default log filter directive
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Console settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// How long the success indicator stays raised, in milliseconds
    pub success_window_ms: u64,
    /// `tracing` filter directive used by binaries
    pub log_filter: String,
    /// Emit logs as JSON lines instead of text
    pub log_json: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            success_window_ms: millis(DEFAULT_SUCCESS_WINDOW),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
        }
    }
}

impl ConsoleConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the success-indicator window
    #[must_use]
    pub fn with_success_window(mut self, window: Duration) -> Self {
        self.success_window_ms = millis(window);
        self
    }

    /// Set the log filter directive
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Success-indicator window
    #[inline]
    #[must_use]
    pub fn success_window(&self) -> Duration {
        Duration::from_millis(self.success_window_ms)
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this struct
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

fn millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Invalid TOML
    #[error("invalid console configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
