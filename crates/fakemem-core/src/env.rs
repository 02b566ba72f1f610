//! Environment variable utilities
//!
//! Only diagnostics read the environment (`FAKEMEM_LOG_LEVEL`,
//! `FAKEMEM_FLUSH_EPRINT`, `MEMPROBE_LINES`); reported values never do.
//!
//! # Usage
//!
//! ```ignore
//! use fakemem_core::env::{env_get, env_get_bool};
//!
//! let lines: usize = env_get("MEMPROBE_LINES", 6);
//! let flush: bool = env_get_bool("FAKEMEM_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts: "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => is_truthy(&val),
        Err(_) => default,
    }
}

/// Get environment variable as optional value
///
/// Returns `Some(T)` if the variable is set and parses successfully.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[inline]
pub(crate) fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__FAKEMEM_TEST_UNSET__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_opt_none() {
        let val: Option<u64> = env_get_opt("__FAKEMEM_TEST_UNSET__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__FAKEMEM_TEST_NUM__", " 123 ");
        let val: usize = env_get("__FAKEMEM_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__FAKEMEM_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__FAKEMEM_TEST_INVALID__", "lots");
        let val: usize = env_get("__FAKEMEM_TEST_INVALID__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__FAKEMEM_TEST_INVALID__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        for (raw, expected) in [("1", true), ("TRUE", true), ("on", true), ("0", false), ("nah", false)] {
            std::env::set_var("__FAKEMEM_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__FAKEMEM_TEST_BOOL__", !expected), expected, "value {:?}", raw);
        }
        std::env::remove_var("__FAKEMEM_TEST_BOOL__");

        assert!(env_get_bool("__FAKEMEM_TEST_BOOL__", true));
    }
}
