//! Exercises the built shared object through its exported symbols.
//!
//! The library is loaded with `dlopen` and its symbols are called directly,
//! so the test process itself is never interposed. Tests are skipped (with
//! a note on stderr) when `libfakemem.so` has not been built next to the
//! test binary.

#![cfg(target_os = "linux")]

use std::ffi::{c_void, CStr, CString};
use std::path::PathBuf;
use std::sync::OnceLock;

use fakemem_core::constants::{FAKE_BYTES, FAKE_KB};
use fakemem_core::meminfo::parse_total_kb;
use libc::{c_char, c_int, c_long, mode_t, FILE};

type SysinfoFn = unsafe extern "C" fn(*mut libc::sysinfo) -> c_int;
type SysconfFn = unsafe extern "C" fn(c_int) -> c_long;
type OpenFn = unsafe extern "C" fn(*const c_char, c_int, mode_t) -> c_int;
type FopenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut FILE;

struct Shim {
    sysinfo: SysinfoFn,
    sysconf: SysconfFn,
    open: OpenFn,
    open64: OpenFn,
    fopen: FopenFn,
    fopen64: FopenFn,
}

/// Candidate locations: `target/<profile>/` and `target/<profile>/deps/`
fn library_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    [deps.parent().map(|p| p.join("libfakemem.so")), Some(deps.join("libfakemem.so"))]
        .into_iter()
        .flatten()
        .find(|p| p.exists())
}

unsafe fn symbol<T: Copy>(handle: *mut c_void, name: &CStr) -> T {
    let sym = libc::dlsym(handle, name.as_ptr());
    assert!(!sym.is_null(), "{:?} not exported", name);
    std::mem::transmute_copy(&sym)
}

fn shim() -> Option<&'static Shim> {
    static SHIM: OnceLock<Option<Shim>> = OnceLock::new();
    SHIM.get_or_init(|| {
        let Some(path) = library_path() else {
            eprintln!("libfakemem.so not built; skipping");
            return None;
        };
        let c_path = CString::new(path.to_string_lossy().into_owned()).unwrap();
        unsafe {
            // Never closed: the library's state outlives every test
            let handle = libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL);
            assert!(!handle.is_null(), "dlopen {} failed", path.display());
            Some(Shim {
                sysinfo: symbol(handle, c"sysinfo"),
                sysconf: symbol(handle, c"sysconf"),
                open: symbol(handle, c"open"),
                open64: symbol(handle, c"open64"),
                fopen: symbol(handle, c"fopen"),
                fopen64: symbol(handle, c"fopen64"),
            })
        }
    })
    .as_ref()
}

unsafe fn read_stream(stream: *mut FILE) -> Vec<u8> {
    assert!(!stream.is_null());
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = libc::fread(buf.as_mut_ptr().cast(), 1, buf.len(), stream);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    libc::fclose(stream);
    out
}

unsafe fn read_fd(fd: c_int) -> Vec<u8> {
    assert!(fd >= 0);
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = libc::read(fd, buf.as_mut_ptr().cast(), buf.len());
        assert!(n >= 0);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n as usize]);
    }
    libc::close(fd);
    out
}

fn total_kb(content: &[u8]) -> Option<u64> {
    parse_total_kb(&String::from_utf8_lossy(content))
}

#[test]
fn test_sysinfo_reports_fake_total() {
    let Some(shim) = shim() else { return };
    let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };
    assert_eq!(unsafe { (shim.sysinfo)(&mut info) }, 0);
    assert_eq!(info.mem_unit, 1);
    assert_eq!(info.totalram as u64, FAKE_BYTES);
    // Real data still present
    assert!(info.uptime > 0);
}

#[test]
fn test_sysconf_reports_fake_pages() {
    let Some(shim) = shim() else { return };
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    assert!(page_size > 0);

    let phys = unsafe { (shim.sysconf)(libc::_SC_PHYS_PAGES) };
    let avail = unsafe { (shim.sysconf)(libc::_SC_AVPHYS_PAGES) };
    assert_eq!(phys as u64, FAKE_BYTES / page_size as u64);
    assert_eq!(phys, avail);

    // Other names pass through
    assert_eq!(unsafe { (shim.sysconf)(libc::_SC_PAGESIZE) }, page_size);
}

#[test]
fn test_meminfo_opens_are_redirected() {
    let Some(shim) = shim() else { return };
    if !std::path::Path::new("/proc/meminfo").exists() {
        return;
    }
    let path = c"/proc/meminfo";

    for fopen in [shim.fopen, shim.fopen64] {
        let content = unsafe { read_stream(fopen(path.as_ptr(), c"r".as_ptr())) };
        assert_eq!(total_kb(&content), Some(FAKE_KB));
        assert_eq!(String::from_utf8_lossy(&content).matches("MemTotal:").count(), 1);
    }

    for open in [shim.open, shim.open64] {
        let content = unsafe { read_fd(open(path.as_ptr(), libc::O_RDONLY | libc::O_CLOEXEC, 0)) };
        assert_eq!(total_kb(&content), Some(FAKE_KB));
    }

    // Content is stable across opens
    let a = unsafe { read_stream((shim.fopen)(path.as_ptr(), c"r".as_ptr())) };
    let b = unsafe { read_stream((shim.fopen)(path.as_ptr(), c"r".as_ptr())) };
    assert_eq!(a, b);
}

#[test]
fn test_other_files_pass_through() {
    let Some(shim) = shim() else { return };
    let manifest = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
    let expected = std::fs::read(manifest).unwrap();
    let c_manifest = CString::new(manifest).unwrap();

    let via_stream = unsafe { read_stream((shim.fopen)(c_manifest.as_ptr(), c"r".as_ptr())) };
    let via_fd = unsafe { read_fd((shim.open)(c_manifest.as_ptr(), libc::O_RDONLY, 0)) };
    assert_eq!(via_stream, expected);
    assert_eq!(via_fd, expected);
}

#[test]
fn test_missing_file_errors_like_libc() {
    let Some(shim) = shim() else { return };
    let missing = c"/nonexistent/fakemem/probe";
    let fd = unsafe { (shim.open)(missing.as_ptr(), libc::O_RDONLY, 0) };
    assert_eq!(fd, -1);
    assert_eq!(unsafe { *libc::__errno_location() }, libc::ENOENT);
    assert!(unsafe { (shim.fopen)(missing.as_ptr(), c"r".as_ptr()) }.is_null());
}

#[test]
fn test_created_file_gets_requested_mode() {
    let Some(shim) = shim() else { return };
    let path = std::env::temp_dir().join(format!("fakemem-preload-{}", std::process::id()));
    let c_path = CString::new(path.to_string_lossy().into_owned()).unwrap();

    let fd = unsafe { (shim.open)(c_path.as_ptr(), libc::O_WRONLY | libc::O_CREAT | libc::O_EXCL, 0o600) };
    assert!(fd >= 0);
    unsafe { libc::close(fd) };

    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    // umask can only clear bits
    assert_eq!(mode & !0o600, 0);
    std::fs::remove_file(&path).unwrap();
}
