//! # fakemem-core
//!
//! Core types for the fakemem preload shim.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Symbol resolution, the on-disk synthesized file and the interceptors
//! live in `fakemem-runtime`; the exported C symbols live in `fakemem`.
//!
//! ## Modules
//!
//! - `config` - Build-time configuration and the synthesizer inputs
//! - `entry` - Logical table of the intercepted entry points
//! - `meminfo` - Rewriting of memory-info text around the fake capacity
//! - `pages` - Page-count arithmetic for the count query
//! - `error` - Error types
//! - `kprint` - Kernel-style leveled stderr logging
//! - `env` - Environment variable utilities

pub mod config;
pub mod entry;
pub mod meminfo;
pub mod pages;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use config::ShimConfig;
pub use entry::Entry;
pub use error::{FakememError, FakememResult};
pub use env::{env_get, env_get_bool, env_get_opt};
pub use kprint::{set_log_level, LogLevel};
pub use meminfo::{emission_line, rewrite_meminfo, RewriteStats};
pub use pages::fake_page_count;

/// Constants shared by every reporting channel
pub mod constants {
    use crate::config::defaults;

    /// Total memory reported everywhere, in bytes
    pub const FAKE_BYTES: u64 = defaults::FAKE_BYTES;

    /// Fake capacity in kilobytes (truncating division)
    pub const FAKE_KB: u64 = FAKE_BYTES / 1024;

    /// Page size assumed when the real page-size query is unavailable
    pub const DEFAULT_PAGE_SIZE: i64 = defaults::DEFAULT_PAGE_SIZE;

    /// The virtual file whose opens are redirected
    pub const MEMINFO_PATH: &str = "/proc/meminfo";

    /// Label of the total-capacity line, including the colon
    pub const MEMTOTAL_LABEL: &str = "MemTotal:";

    /// Unit suffix used on the emitted total-capacity line
    pub const KB_SUFFIX: &str = "kB";

    /// File name prefix of the synthesized file (mkstemp appends `XXXXXX`)
    pub const TEMP_PREFIX: &str = defaults::TEMP_PREFIX;

    /// Permission bits of the synthesized file once written
    pub const SYNTH_MODE: u32 = 0o444;
}

#[cfg(test)]
mod tests {
    use super::constants::*;

    #[test]
    fn test_default_capacity() {
        assert!(FAKE_BYTES >= 1024);
        assert_eq!(FAKE_KB * 1024, FAKE_BYTES - FAKE_BYTES % 1024);
        assert!(DEFAULT_PAGE_SIZE > 0);
    }

    #[test]
    fn test_label_shape() {
        assert!(MEMTOTAL_LABEL.ends_with(':'));
        assert!(MEMINFO_PATH.starts_with('/'));
        assert_eq!(SYNTH_MODE & 0o222, 0);
    }
}
