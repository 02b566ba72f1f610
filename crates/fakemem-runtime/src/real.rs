//! Real entry point resolution
//!
//! `RealEntryPoints` is the seam between the interceptors and the process's
//! genuine libc implementations. `DlsymResolver` is the production
//! implementation: a fixed table of atomic slots indexed by `Entry`, each
//! filled at most once with `dlsym(RTLD_NEXT, name)`.
//!
//! Slot population is a compare-and-set, so several threads racing through
//! their first intercepted call all end up with the same pointer. A failed
//! lookup leaves the slot empty and is retried on the next request.

use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use fakemem_core::Entry;
use libc::{c_char, c_int, c_long, c_void, mode_t, FILE};

type SysinfoFn = unsafe extern "C" fn(*mut libc::sysinfo) -> c_int;
type SysconfFn = unsafe extern "C" fn(c_int) -> c_long;
type OpenFn = unsafe extern "C" fn(*const c_char, c_int, ...) -> c_int;
type FopenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut FILE;

/// Access to the genuine implementations of the intercepted operations.
///
/// Every method returns `None` when the implementation is unavailable;
/// callers decide whether that is a failure or a fallback.
///
/// # Safety
///
/// Methods forward raw pointers to C; callers uphold the C contracts of
/// the wrapped function (valid, NUL-terminated strings, writable records).
pub trait RealEntryPoints: Sync {
    /// Real `sysinfo`
    unsafe fn sysinfo(&self, info: *mut libc::sysinfo) -> Option<c_int>;

    /// Real `sysconf`
    unsafe fn sysconf(&self, name: c_int) -> Option<c_long>;

    /// Real `open` or `open64` (per `entry`), with an explicit creation mode
    unsafe fn open(
        &self,
        entry: Entry,
        path: *const c_char,
        flags: c_int,
        mode: mode_t,
    ) -> Option<c_int>;

    /// Real `fopen` or `fopen64` (per `entry`)
    unsafe fn fopen(&self, entry: Entry, path: *const c_char, mode: *const c_char) -> Option<*mut FILE>;

    /// Resolve everything up front; returns how many entries are available.
    fn resolve_all(&self) -> usize {
        0
    }
}

/// Process-wide resolver used by the exported symbols
pub static RESOLVER: DlsymResolver = DlsymResolver::new();

/// `dlsym(RTLD_NEXT)`-backed resolution table
pub struct DlsymResolver {
    slots: [AtomicPtr<c_void>; Entry::COUNT],
}

impl Default for DlsymResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DlsymResolver {
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicPtr::new(ptr::null_mut()) }; Entry::COUNT],
        }
    }

    /// Resolve `entry`, consulting the cache first.
    ///
    /// Entries with a fallback (`open64` -> `open`, `fopen64` -> `fopen`)
    /// cache the fallback's implementation in their own slot.
    pub fn resolve(&self, entry: Entry) -> Option<NonNull<c_void>> {
        let slot = &self.slots[entry.index()];
        let cached = slot.load(Ordering::Acquire);
        if !cached.is_null() {
            return NonNull::new(cached);
        }

        // SAFETY: symbol names are NUL-terminated literals
        let mut found = unsafe { libc::dlsym(libc::RTLD_NEXT, entry.symbol().as_ptr()) };
        if found.is_null() {
            if let Some(fallback) = entry.fallback() {
                found = self.resolve(fallback).map_or(ptr::null_mut(), NonNull::as_ptr);
            }
        }
        if found.is_null() {
            return None;
        }

        match slot.compare_exchange(ptr::null_mut(), found, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => NonNull::new(found),
            Err(winner) => NonNull::new(winner),
        }
    }

    /// Whether `entry` is already cached (no lookup performed)
    pub fn is_cached(&self, entry: Entry) -> bool {
        !self.slots[entry.index()].load(Ordering::Acquire).is_null()
    }
}

impl RealEntryPoints for DlsymResolver {
    unsafe fn sysinfo(&self, info: *mut libc::sysinfo) -> Option<c_int> {
        let f = self.resolve(Entry::Sysinfo)?;
        let f: SysinfoFn = std::mem::transmute(f.as_ptr());
        Some(f(info))
    }

    unsafe fn sysconf(&self, name: c_int) -> Option<c_long> {
        let f = self.resolve(Entry::Sysconf)?;
        let f: SysconfFn = std::mem::transmute(f.as_ptr());
        Some(f(name))
    }

    unsafe fn open(
        &self,
        entry: Entry,
        path: *const c_char,
        flags: c_int,
        mode: mode_t,
    ) -> Option<c_int> {
        debug_assert!(matches!(entry, Entry::Open | Entry::Open64));
        let f = self.resolve(entry)?;
        let f: OpenFn = std::mem::transmute(f.as_ptr());
        // Variadic mode argument is promoted to unsigned int
        Some(f(path, flags, mode as libc::c_uint))
    }

    unsafe fn fopen(&self, entry: Entry, path: *const c_char, mode: *const c_char) -> Option<*mut FILE> {
        debug_assert!(matches!(entry, Entry::Fopen | Entry::Fopen64));
        let f = self.resolve(entry)?;
        let f: FopenFn = std::mem::transmute(f.as_ptr());
        Some(f(path, mode))
    }

    fn resolve_all(&self) -> usize {
        Entry::ALL
            .iter()
            .filter(|&&entry| self.resolve(entry).is_some())
            .count()
    }
}
