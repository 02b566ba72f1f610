//! Logical entry points intercepted by the shim
//!
//! Each variant names one operation whose genuine implementation the
//! runtime resolves and caches. The enum doubles as the index into the
//! runtime's fixed-size resolution table.

use core::ffi::CStr;
use core::fmt;

/// Intercepted operation
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entry {
    /// Structured-info query (`sysinfo`)
    Sysinfo = 0,
    /// Count query (`sysconf`)
    Sysconf = 1,
    /// Primary file open (`open`)
    Open = 2,
    /// Large-file file open (`open64`)
    Open64 = 3,
    /// Buffered-stream open (`fopen`)
    Fopen = 4,
    /// Large-file buffered-stream open (`fopen64`)
    Fopen64 = 5,
}

impl Entry {
    /// Number of entries, i.e. the resolution table size
    pub const COUNT: usize = 6;

    /// Every entry, in table order
    pub const ALL: [Entry; Entry::COUNT] = [
        Entry::Sysinfo,
        Entry::Sysconf,
        Entry::Open,
        Entry::Open64,
        Entry::Fopen,
        Entry::Fopen64,
    ];

    /// Table slot
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Symbol name passed to the dynamic linker
    pub const fn symbol(self) -> &'static CStr {
        match self {
            Entry::Sysinfo => c"sysinfo",
            Entry::Sysconf => c"sysconf",
            Entry::Open => c"open",
            Entry::Open64 => c"open64",
            Entry::Fopen => c"fopen",
            Entry::Fopen64 => c"fopen64",
        }
    }

    /// Entry whose implementation stands in when this one is not exported.
    ///
    /// The large-file variants are aliases of the plain ones on LP64 libcs
    /// and may be missing entirely (musl).
    pub const fn fallback(self) -> Option<Entry> {
        match self {
            Entry::Open64 => Some(Entry::Open),
            Entry::Fopen64 => Some(Entry::Fopen),
            _ => None,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Symbol names are ASCII literals
        write!(f, "{}", self.symbol().to_str().unwrap_or("?"))
    }
}
