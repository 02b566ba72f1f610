//! Cross-channel consistency report
//!
//! Collects what each reporting channel says about total memory and checks
//! that they agree. `ProcessChannels` asks the process's libc (which is the
//! shim when preloaded); an `Interceptor` asks the interceptor directly.

use std::ffi::CStr;

use fakemem_core::meminfo::parse_total_kb;
use fakemem_core::Entry;
use libc::{c_int, c_long, FILE};

use crate::intercept::Interceptor;
use crate::real::RealEntryPoints;

const MEMINFO_C: &CStr = c"/proc/meminfo";
const READ_MODE: &CStr = c"r";

/// Source of the three reporting channels
pub trait Channels {
    /// Structured-info query
    fn sysinfo(&self) -> Option<libc::sysinfo>;

    /// Count query; `None` on failure
    fn sysconf(&self, name: c_int) -> Option<c_long>;

    /// Memory-info content read through the buffered-stream open
    fn read_meminfo_stream(&self) -> Option<Vec<u8>>;

    /// Memory-info content read through the descriptor open
    fn read_meminfo_fd(&self) -> Option<Vec<u8>>;
}

/// Channels as seen by any code in this process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessChannels;

impl Channels for ProcessChannels {
    fn sysinfo(&self) -> Option<libc::sysinfo> {
        // SAFETY: zeroed sysinfo is a valid plain-data record
        let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };
        (unsafe { libc::sysinfo(&mut info) } == 0).then_some(info)
    }

    fn sysconf(&self, name: c_int) -> Option<c_long> {
        let v = unsafe { libc::sysconf(name) };
        (v >= 0).then_some(v)
    }

    fn read_meminfo_stream(&self) -> Option<Vec<u8>> {
        // SAFETY: both arguments are NUL-terminated literals
        let stream = unsafe { libc::fopen(MEMINFO_C.as_ptr(), READ_MODE.as_ptr()) };
        unsafe { drain_stream(stream) }
    }

    fn read_meminfo_fd(&self) -> Option<Vec<u8>> {
        let fd = unsafe { libc::open(MEMINFO_C.as_ptr(), libc::O_RDONLY | libc::O_CLOEXEC) };
        unsafe { drain_fd(fd) }
    }
}

impl<R: RealEntryPoints + ?Sized> Channels for Interceptor<'_, R> {
    fn sysinfo(&self) -> Option<libc::sysinfo> {
        let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };
        (unsafe { Interceptor::sysinfo(self, &mut info) } == 0).then_some(info)
    }

    fn sysconf(&self, name: c_int) -> Option<c_long> {
        let v = unsafe { Interceptor::sysconf(self, name) };
        (v >= 0).then_some(v)
    }

    fn read_meminfo_stream(&self) -> Option<Vec<u8>> {
        let stream = unsafe { self.fopen(Entry::Fopen, MEMINFO_C.as_ptr(), READ_MODE.as_ptr()) };
        unsafe { drain_stream(stream) }
    }

    fn read_meminfo_fd(&self) -> Option<Vec<u8>> {
        let fd = unsafe { self.open(Entry::Open, MEMINFO_C.as_ptr(), libc::O_RDONLY | libc::O_CLOEXEC, 0) };
        unsafe { drain_fd(fd) }
    }
}

/// Read a stream to the end and close it
unsafe fn drain_stream(stream: *mut FILE) -> Option<Vec<u8>> {
    if stream.is_null() {
        return None;
    }
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = libc::fread(buf.as_mut_ptr().cast(), 1, buf.len(), stream);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    let failed = libc::ferror(stream) != 0;
    libc::fclose(stream);
    (!failed).then_some(out)
}

/// Read a descriptor to the end and close it
unsafe fn drain_fd(fd: c_int) -> Option<Vec<u8>> {
    if fd < 0 {
        return None;
    }
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    let ok = loop {
        let n = libc::read(fd, buf.as_mut_ptr().cast(), buf.len());
        if n < 0 {
            if *libc::__errno_location() == libc::EINTR {
                continue;
            }
            break false;
        }
        if n == 0 {
            break true;
        }
        out.extend_from_slice(&buf[..n as usize]);
    };
    libc::close(fd);
    ok.then_some(out)
}

/// What every channel reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelReport {
    /// `sysinfo` total in bytes (`totalram * mem_unit`)
    pub sysinfo_bytes: Option<u64>,
    /// `sysinfo` unit size as reported
    pub mem_unit: Option<u32>,
    /// `sysconf(_SC_PHYS_PAGES)`
    pub phys_pages: Option<i64>,
    /// `sysconf(_SC_AVPHYS_PAGES)`
    pub avail_pages: Option<i64>,
    /// `sysconf(_SC_PAGESIZE)`
    pub page_size: Option<i64>,
    /// Total-capacity line of the memory-info file read through `fopen`
    pub stream_kb: Option<u64>,
    /// Total-capacity line of the memory-info file read through `open`
    pub fd_kb: Option<u64>,
    /// Full memory-info text read through `fopen`
    pub meminfo: String,
}

impl ChannelReport {
    /// Query every channel of `channels`
    pub fn gather<C: Channels + ?Sized>(channels: &C) -> Self {
        let info = channels.sysinfo();
        let stream = channels.read_meminfo_stream();
        let fd = channels.read_meminfo_fd();
        let meminfo = stream
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();

        Self {
            sysinfo_bytes: info.map(|i| (i.totalram as u64).saturating_mul(i.mem_unit as u64)),
            mem_unit: info.map(|i| i.mem_unit as u32),
            phys_pages: channels.sysconf(libc::_SC_PHYS_PAGES).map(i64::from),
            avail_pages: channels.sysconf(libc::_SC_AVPHYS_PAGES).map(i64::from),
            page_size: channels.sysconf(libc::_SC_PAGESIZE).map(i64::from),
            stream_kb: parse_total_kb(&meminfo),
            fd_kb: fd.and_then(|b| parse_total_kb(&String::from_utf8_lossy(&b))),
            meminfo,
        }
    }

    /// Page-count channel converted to bytes
    pub fn sysconf_bytes(&self) -> Option<u64> {
        Some((self.phys_pages? as u64).saturating_mul(self.page_size? as u64))
    }

    /// Whether every channel reports exactly `fake_bytes`, each in its own
    /// unit with truncating conversion
    pub fn agrees_with(&self, fake_bytes: u64) -> bool {
        let Some(page_size) = self.page_size.filter(|&p| p > 0) else {
            return false;
        };
        let pages = (fake_bytes / page_size as u64) as i64;
        let kb = fake_bytes / 1024;

        self.sysinfo_bytes == Some(fake_bytes)
            && self.phys_pages == Some(pages)
            && self.avail_pages == Some(pages)
            && self.stream_kb == Some(kb)
            && self.fd_kb == Some(kb)
    }

    /// Whether the channels agree among themselves, whatever the value
    pub fn channels_agree(&self) -> bool {
        match self.sysinfo_bytes {
            Some(total) => self.agrees_with(total),
            None => false,
        }
    }

    /// The first `n` lines of the memory-info text
    pub fn meminfo_head(&self, n: usize) -> impl Iterator<Item = &str> {
        self.meminfo.lines().take(n)
    }
}
