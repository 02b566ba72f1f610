//! Error types for the fakemem shim
//!
//! None of these ever reach the host process: the exported C symbols turn
//! every failure into pass-through behavior or the C return convention.

use core::fmt;

/// Result type for shim operations
pub type FakememResult<T> = Result<T, FakememError>;

/// errno reported for I/O errors that carry no OS code (Linux `EIO`)
const EIO: i32 = 5;

/// Errors that can occur while building or tearing down the synthesized file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakememError {
    /// mkstemp failed
    TempFile(i32),

    /// Writing the synthesized file failed
    Write(i32),

    /// Reading the real memory-info file failed mid-copy
    Read(i32),

    /// chmod of the synthesized file failed
    Permissions(i32),

    /// Removing the synthesized file failed
    Unlink(i32),

    /// Path contains an interior NUL byte
    InvalidPath,

    /// Synthesizer configuration rejected
    Config(&'static str),
}

impl FakememError {
    /// Build a `Read` error from an I/O error
    pub fn read(e: &std::io::Error) -> Self {
        FakememError::Read(errno_of(e))
    }

    /// Build a `Write` error from an I/O error
    pub fn write(e: &std::io::Error) -> Self {
        FakememError::Write(errno_of(e))
    }

    /// errno carried by this error, if any
    pub fn errno(&self) -> Option<i32> {
        match self {
            FakememError::TempFile(e)
            | FakememError::Write(e)
            | FakememError::Read(e)
            | FakememError::Permissions(e)
            | FakememError::Unlink(e) => Some(*e),
            FakememError::InvalidPath | FakememError::Config(_) => None,
        }
    }
}

impl fmt::Display for FakememError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FakememError::TempFile(e) => write!(f, "temp file creation failed: errno {}", e),
            FakememError::Write(e) => write!(f, "write failed: errno {}", e),
            FakememError::Read(e) => write!(f, "read failed: errno {}", e),
            FakememError::Permissions(e) => write!(f, "chmod failed: errno {}", e),
            FakememError::Unlink(e) => write!(f, "unlink failed: errno {}", e),
            FakememError::InvalidPath => write!(f, "path contains a NUL byte"),
            FakememError::Config(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for FakememError {}

impl From<crate::config::ConfigError> for FakememError {
    fn from(e: crate::config::ConfigError) -> Self {
        match e {
            crate::config::ConfigError::InvalidValue(msg) => FakememError::Config(msg),
        }
    }
}

#[inline]
fn errno_of(e: &std::io::Error) -> i32 {
    e.raw_os_error().unwrap_or(EIO)
}
