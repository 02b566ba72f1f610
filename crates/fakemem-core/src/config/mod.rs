//! fakemem configuration
//!
//! The reported capacity is a compile-time constant (see `build.rs`);
//! nothing read at runtime changes a reported value.
//!
//! `ShimConfig` bundles the inputs the synthesizer needs. The attach hook
//! uses `ShimConfig::new()`; tests point it at fixture files instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use fakemem_core::config::ShimConfig;
//!
//! let config = ShimConfig::new()
//!     .source("/tmp/fixture_meminfo")
//!     .temp_dir("/tmp/fakemem-test");
//! ```

pub mod defaults;

use std::path::{Path, PathBuf};

use crate::constants::{MEMINFO_PATH, TEMP_PREFIX};

/// Inputs of the synthesized memory-info file, with builder methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// Real memory-info file to copy
    pub source: PathBuf,
    /// Directory receiving the synthesized file
    pub temp_dir: PathBuf,
    /// Capacity written to the total-capacity line, in bytes
    pub fake_bytes: u64,
    /// File name prefix handed to mkstemp
    pub temp_prefix: String,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ShimConfig {
    /// Compile-time configuration: `/proc/meminfo`, the standard temp
    /// directory and the build-time fake capacity.
    pub fn new() -> Self {
        Self {
            source: PathBuf::from(MEMINFO_PATH),
            temp_dir: std::env::temp_dir(),
            fake_bytes: defaults::FAKE_BYTES,
            temp_prefix: TEMP_PREFIX.to_string(),
        }
    }

    // Builder methods

    pub fn source(mut self, path: impl AsRef<Path>) -> Self {
        self.source = path.as_ref().to_path_buf();
        self
    }

    pub fn temp_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn fake_bytes(mut self, bytes: u64) -> Self {
        self.fake_bytes = bytes;
        self
    }

    pub fn temp_prefix(mut self, prefix: &str) -> Self {
        self.temp_prefix = prefix.to_string();
        self
    }

    /// Fake capacity in kilobytes, truncating any sub-kilobyte remainder.
    #[inline]
    pub fn fake_kb(&self) -> u64 {
        self.fake_bytes / 1024
    }

    /// mkstemp template: `<temp_dir>/<prefix>XXXXXX`
    pub fn temp_template(&self) -> PathBuf {
        self.temp_dir.join(format!("{}XXXXXX", self.temp_prefix))
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fake_bytes < 1024 {
            return Err(ConfigError::InvalidValue("fake_bytes must be >= 1024"));
        }
        if self.temp_prefix.is_empty() {
            return Err(ConfigError::InvalidValue("temp_prefix must not be empty"));
        }
        if self.temp_prefix.contains('/') {
            return Err(ConfigError::InvalidValue("temp_prefix must not contain '/'"));
        }
        if self.temp_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("temp_dir must not be empty"));
        }
        Ok(())
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FAKE_BYTES, FAKE_KB};

    #[test]
    fn test_new_uses_build_constants() {
        let config = ShimConfig::new();
        assert_eq!(config.source, PathBuf::from("/proc/meminfo"));
        assert_eq!(config.fake_bytes, FAKE_BYTES);
        assert_eq!(config.fake_kb(), FAKE_KB);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ShimConfig::new()
            .source("/nonexistent/meminfo")
            .temp_dir("/var/tmp")
            .fake_bytes(2048 + 1023)
            .temp_prefix("probe_");

        assert_eq!(config.source, PathBuf::from("/nonexistent/meminfo"));
        assert_eq!(config.fake_kb(), 2);
        assert_eq!(config.temp_template(), PathBuf::from("/var/tmp/probe_XXXXXX"));
    }

    #[test]
    fn test_validation() {
        assert!(ShimConfig::new().fake_bytes(512).validate().is_err());
        assert!(ShimConfig::new().temp_prefix("").validate().is_err());
        assert!(ShimConfig::new().temp_prefix("a/b").validate().is_err());

        let err = ShimConfig::new().fake_bytes(0).validate().unwrap_err();
        assert_eq!(format!("{}", err), "invalid config: fake_bytes must be >= 1024");
    }
}
