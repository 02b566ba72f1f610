//! Reporting interceptors
//!
//! The three channels through which a process learns its memory size, each
//! derived from the same fake capacity:
//!
//! - `sysinfo`: real call first, then `totalram` = capacity, `mem_unit` = 1
//! - `sysconf`: `_SC_PHYS_PAGES` / `_SC_AVPHYS_PAGES` = capacity / page size
//! - `open`/`open64`/`fopen`/`fopen64`: `/proc/meminfo` is swapped for the
//!   synthesized file while one is recorded
//!
//! `Interceptor` holds no state of its own; it borrows a `RealEntryPoints`
//! implementation and the synthesized path. The exported C symbols use
//! `Interceptor::global()`.

use std::ffi::CStr;

use fakemem_core::constants::{FAKE_BYTES, MEMINFO_PATH};
use fakemem_core::{fake_page_count, Entry};
use libc::{c_char, c_int, c_long, c_ulong, mode_t, FILE};

use crate::real::{DlsymResolver, RealEntryPoints, RESOLVER};
use crate::set_errno;
use crate::state::{SynthPath, SYNTH_PATH};

/// Interceptor logic over a resolver and a synthesized path
pub struct Interceptor<'a, R: RealEntryPoints + ?Sized> {
    real: &'a R,
    synth: &'a SynthPath,
    fake_bytes: u64,
}

impl Interceptor<'static, DlsymResolver> {
    /// Process-wide interceptor backing the exported symbols
    #[inline]
    pub fn global() -> Self {
        Interceptor::new(&RESOLVER, &SYNTH_PATH)
    }
}

impl<'a, R: RealEntryPoints + ?Sized> Interceptor<'a, R> {
    pub fn new(real: &'a R, synth: &'a SynthPath) -> Self {
        Self {
            real,
            synth,
            fake_bytes: FAKE_BYTES,
        }
    }

    /// Report a different capacity (tests and tooling)
    pub fn with_fake_bytes(mut self, bytes: u64) -> Self {
        self.fake_bytes = bytes;
        self
    }

    pub fn fake_bytes(&self) -> u64 {
        self.fake_bytes
    }

    // ------------------------------------------------------------------
    // Structured-info query
    // ------------------------------------------------------------------

    /// `sysinfo` with `totalram` overlaid.
    ///
    /// # Safety
    ///
    /// `info` must be null or point to a writable `struct sysinfo`.
    pub unsafe fn sysinfo(&self, info: *mut libc::sysinfo) -> c_int {
        let Some(ret) = self.real.sysinfo(info) else {
            set_errno(libc::ENOSYS);
            return -1;
        };

        if ret == 0 {
            if let Some(info) = info.as_mut() {
                info.mem_unit = 1;
                info.totalram = c_ulong::try_from(self.fake_bytes).unwrap_or(c_ulong::MAX);
            }
        }
        ret
    }

    // ------------------------------------------------------------------
    // Count query
    // ------------------------------------------------------------------

    /// `sysconf` with the physical page counters faked.
    ///
    /// # Safety
    ///
    /// Same contract as libc `sysconf` (none beyond a valid process).
    pub unsafe fn sysconf(&self, name: c_int) -> c_long {
        if name == libc::_SC_PHYS_PAGES || name == libc::_SC_AVPHYS_PAGES {
            return self.fake_pages();
        }

        match self.real.sysconf(name) {
            Some(v) => v,
            None => {
                set_errno(libc::ENOSYS);
                -1
            }
        }
    }

    /// Page count reported for both physical page counters
    pub fn fake_pages(&self) -> c_long {
        // SAFETY: _SC_PAGESIZE has no pointer arguments
        let page_size = unsafe { self.real.sysconf(libc::_SC_PAGESIZE) };
        fake_page_count(self.fake_bytes, page_size.map(i64::from), c_long::MAX as i64) as c_long
    }

    // ------------------------------------------------------------------
    // File-open redirection
    // ------------------------------------------------------------------

    /// Path to hand to the real open: the synthesized file when `path` is
    /// exactly the memory-info path and one is recorded, else `path`.
    ///
    /// # Safety
    ///
    /// `path` must be null or a valid NUL-terminated string.
    pub unsafe fn redirect(&self, path: *const c_char) -> *const c_char {
        if path.is_null() {
            return path;
        }
        let synth = self.synth.as_ptr();
        if synth.is_null() {
            return path;
        }
        if CStr::from_ptr(path).to_bytes() == MEMINFO_PATH.as_bytes() {
            synth
        } else {
            path
        }
    }

    /// `open` / `open64` (per `entry`) with redirection.
    ///
    /// # Safety
    ///
    /// `path` must be null or a valid NUL-terminated string.
    pub unsafe fn open(&self, entry: Entry, path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
        let target = self.redirect(path);
        match self.real.open(entry, target, flags, creation_mode(flags, mode)) {
            Some(fd) => fd,
            None => {
                set_errno(libc::ENOSYS);
                -1
            }
        }
    }

    /// `fopen` / `fopen64` (per `entry`) with redirection.
    ///
    /// # Safety
    ///
    /// `path` and `mode` must be null or valid NUL-terminated strings.
    pub unsafe fn fopen(&self, entry: Entry, path: *const c_char, mode: *const c_char) -> *mut FILE {
        let target = self.redirect(path);
        match self.real.fopen(entry, target, mode) {
            Some(stream) => stream,
            None => {
                set_errno(libc::ENOSYS);
                std::ptr::null_mut()
            }
        }
    }
}

/// Creation mode to forward: the caller's when the flags consume one,
/// otherwise 0 (the variadic slot holds garbage).
#[inline]
pub fn creation_mode(flags: c_int, mode: mode_t) -> mode_t {
    if flags & libc::O_CREAT != 0 || flags & libc::O_TMPFILE == libc::O_TMPFILE {
        mode
    } else {
        0
    }
}
