//! Memory channel probe
//!
//! Prints total memory as reported by `sysinfo`, `sysconf` and the head of
//! `/proc/meminfo`, all through the process's own libc. Run it preloaded to
//! see the shim at work:
//!
//! ```text
//! LD_PRELOAD=target/release/libfakemem.so ./target/release/memprobe --check
//! ```
//!
//! # Flags
//!
//! - `--check` - exit with status 1 unless every channel reports the same total
//!
//! # Environment Variables
//!
//! - `MEMPROBE_LINES=n` - memory-info lines to print (default 6)
//! - `FAKEMEM_LOG_LEVEL=debug` - shim log level (off, error, warn, info, debug, trace)

use fakemem_core::env_get;
use fakemem_runtime::{ChannelReport, ProcessChannels};
use std::process::ExitCode;

const DEFAULT_LINES: usize = 6;

fn show<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "unavailable".into())
}

fn main() -> ExitCode {
    let check = std::env::args().skip(1).any(|a| a == "--check");
    let lines = env_get("MEMPROBE_LINES", DEFAULT_LINES);

    let report = ChannelReport::gather(&ProcessChannels);

    println!("=== sysinfo ===");
    println!("  totalram * mem_unit : {} bytes", show(report.sysinfo_bytes));
    println!("  mem_unit            : {}", show(report.mem_unit));

    println!("=== sysconf ===");
    println!("  _SC_PAGESIZE        : {}", show(report.page_size));
    println!("  _SC_PHYS_PAGES      : {}", show(report.phys_pages));
    println!("  _SC_AVPHYS_PAGES    : {}", show(report.avail_pages));
    println!("  pages * page size   : {} bytes", show(report.sysconf_bytes()));

    println!("=== /proc/meminfo ===");
    println!("  MemTotal via fopen  : {} kB", show(report.stream_kb));
    println!("  MemTotal via open   : {} kB", show(report.fd_kb));
    for line in report.meminfo_head(lines) {
        println!("  | {}", line);
    }

    if !check {
        return ExitCode::SUCCESS;
    }

    if report.channels_agree() {
        println!("\nOK: all channels agree");
        ExitCode::SUCCESS
    } else {
        println!("\nMISMATCH: channels disagree");
        ExitCode::FAILURE
    }
}
