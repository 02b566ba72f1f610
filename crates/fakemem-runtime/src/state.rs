//! Process-wide synthesized file path
//!
//! Written by attach (publish) and detach (take); read by every
//! interceptor. Contract:
//! - initialization-before-use: attach publishes before the host's `main`
//! - teardown-after-last-use: detach takes the path only once no thread can
//!   still be inside an intercepted open that borrowed it
//!
//! The path is an owned `CString` leaked into an atomic pointer, so readers
//! get a C pointer without locking or allocating.

use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use libc::c_char;

/// Path of the synthesized file used by the exported symbols
pub static SYNTH_PATH: SynthPath = SynthPath::new();

/// Atomically published path of the synthesized file; empty until attach
/// succeeds.
pub struct SynthPath {
    ptr: AtomicPtr<c_char>,
}

impl Default for SynthPath {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthPath {
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Record `path`. If a path is already recorded it is kept and `path`
    /// is handed back.
    pub fn publish(&self, path: CString) -> Result<(), CString> {
        let raw = path.into_raw();
        match self
            .ptr
            .compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            // SAFETY: raw came from into_raw above and was never shared
            Err(_) => Err(unsafe { CString::from_raw(raw) }),
        }
    }

    /// Whether a path is recorded
    #[inline]
    pub fn is_set(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    /// Raw pointer to the recorded path, null when empty.
    ///
    /// Valid until the next `take`.
    #[inline]
    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.load(Ordering::Acquire)
    }

    /// Run `f` with the recorded path borrowed.
    pub fn with<R>(&self, f: impl FnOnce(Option<&CStr>) -> R) -> R {
        let raw = self.as_ptr();
        if raw.is_null() {
            f(None)
        } else {
            // SAFETY: non-null pointers here always come from CString::into_raw
            f(Some(unsafe { CStr::from_ptr(raw) }))
        }
    }

    /// Clear the recorded path and return ownership of it.
    pub fn take(&self) -> Option<CString> {
        let raw = self.ptr.swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            None
        } else {
            // SAFETY: produced by into_raw in publish; the swap made us sole owner
            Some(unsafe { CString::from_raw(raw) })
        }
    }
}

impl Drop for SynthPath {
    fn drop(&mut self) {
        drop(self.take());
    }
}
