//! # fakemem
//!
//! Preload shim reporting a fixed total memory size.
//!
//! Build the shared object and load it ahead of libc:
//!
//! ```text
//! cargo build --release -p fakemem
//! LD_PRELOAD=target/release/libfakemem.so free -h
//! ```
//!
//! Exported symbols (all forwarding to `fakemem_runtime::Interceptor`):
//!
//! - `sysinfo` - `totalram` = fake capacity, `mem_unit` = 1
//! - `sysconf` - `_SC_PHYS_PAGES` / `_SC_AVPHYS_PAGES` = capacity / page size
//! - `open`, `open64`, `fopen`, `fopen64` - `/proc/meminfo` served from a
//!   synthesized file
//!
//! The synthesized file is created from `.init_array` when the object is
//! loaded and removed from `.fini_array` when it is unloaded.
//!
//! The capacity is fixed at build time; see `fakemem-core/build.rs`.

#![allow(clippy::missing_safety_doc)]

use fakemem_core::Entry;
use fakemem_runtime::{lifecycle, Interceptor};
use libc::{c_char, c_int, c_long, mode_t, FILE};

// ============================================================================
// Lifecycle hooks
// ============================================================================

extern "C" fn fakemem_attach() {
    lifecycle::attach();
}

extern "C" fn fakemem_detach() {
    lifecycle::detach();
}

#[used]
#[link_section = ".init_array"]
static ATTACH_HOOK: extern "C" fn() = fakemem_attach;

#[used]
#[link_section = ".fini_array"]
static DETACH_HOOK: extern "C" fn() = fakemem_detach;

// ============================================================================
// Structured-info and count queries
// ============================================================================

#[no_mangle]
pub unsafe extern "C" fn sysinfo(info: *mut libc::sysinfo) -> c_int {
    Interceptor::global().sysinfo(info)
}

#[no_mangle]
pub unsafe extern "C" fn sysconf(name: c_int) -> c_long {
    Interceptor::global().sysconf(name)
}

// ============================================================================
// File opens
// ============================================================================
// The C prototypes are variadic; the mode slot is read as a fixed third
// argument and only forwarded when the flags call for it.

#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    Interceptor::global().open(Entry::Open, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    Interceptor::global().open(Entry::Open64, path, flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn fopen(path: *const c_char, mode: *const c_char) -> *mut FILE {
    Interceptor::global().fopen(Entry::Fopen, path, mode)
}

#[no_mangle]
pub unsafe extern "C" fn fopen64(path: *const c_char, mode: *const c_char) -> *mut FILE {
    Interceptor::global().fopen(Entry::Fopen64, path, mode)
}
