//! Memory-info text rewriting
//!
//! Produces the content of the synthesized memory-info file: every line of
//! the source is copied byte for byte, except the total-capacity line,
//! which is replaced by a single `MemTotal: <kB> kB` emission. Later lines
//! carrying the same label are dropped. When the source has no such line
//! the emission is appended; when there is no source at all the output is
//! the emission alone.
//!
//! Lines are handled as raw bytes so non-UTF-8 content survives untouched.

use std::io::{BufRead, Write};

use crate::constants::{KB_SUFFIX, MEMTOTAL_LABEL};
use crate::error::{FakememError, FakememResult};

/// What a rewrite did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Source lines copied verbatim
    pub copied: usize,
    /// Total-capacity line found in the source and replaced in place
    pub replaced: bool,
    /// Extra total-capacity lines dropped after the first
    pub suppressed: usize,
    /// Emission appended at the end (no source, or no label in it)
    pub appended: bool,
}

/// The single total-capacity line, newline included
pub fn emission_line(fake_kb: u64) -> String {
    format!("{} {} {}\n", MEMTOTAL_LABEL, fake_kb, KB_SUFFIX)
}

/// Whether a raw line carries the total-capacity label
#[inline]
pub fn is_total_line(line: &[u8]) -> bool {
    line.starts_with(MEMTOTAL_LABEL.as_bytes())
}

/// Copy `source` into `out`, substituting the total-capacity line.
///
/// `None` as source yields the minimal single-line file. Read errors map to
/// `FakememError::Read`, write errors to `FakememError::Write`.
pub fn rewrite_meminfo<R, W>(source: Option<R>, out: &mut W, fake_kb: u64) -> FakememResult<RewriteStats>
where
    R: BufRead,
    W: Write,
{
    let emission = emission_line(fake_kb);
    let mut stats = RewriteStats::default();

    let Some(mut source) = source else {
        out.write_all(emission.as_bytes()).map_err(|e| FakememError::write(&e))?;
        stats.appended = true;
        return Ok(stats);
    };

    let mut line = Vec::with_capacity(128);
    let mut ends_with_newline = true;

    loop {
        line.clear();
        let n = source
            .read_until(b'\n', &mut line)
            .map_err(|e| FakememError::read(&e))?;
        if n == 0 {
            break;
        }

        if is_total_line(&line) {
            if stats.replaced {
                stats.suppressed += 1;
                continue;
            }
            out.write_all(emission.as_bytes()).map_err(|e| FakememError::write(&e))?;
            stats.replaced = true;
            ends_with_newline = true;
            continue;
        }

        out.write_all(&line).map_err(|e| FakememError::write(&e))?;
        stats.copied += 1;
        ends_with_newline = line.last() == Some(&b'\n');
    }

    if !stats.replaced {
        if !ends_with_newline {
            out.write_all(b"\n").map_err(|e| FakememError::write(&e))?;
        }
        out.write_all(emission.as_bytes()).map_err(|e| FakememError::write(&e))?;
        stats.appended = true;
    }

    out.flush().map_err(|e| FakememError::write(&e))?;
    Ok(stats)
}

/// Parse the kB value of the total-capacity line out of memory-info text.
pub fn parse_total_kb(content: &str) -> Option<u64> {
    content
        .lines()
        .find(|l| l.starts_with(MEMTOTAL_LABEL))
        .and_then(|l| l[MEMTOTAL_LABEL.len()..].split_whitespace().next())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "MemTotal:        8056424 kB\n\
                          MemFree:          312800 kB\n\
                          MemAvailable:    4523400 kB\n\
                          Buffers:          201324 kB\n";

    fn rewrite(source: Option<&str>, kb: u64) -> (String, RewriteStats) {
        let mut out = Vec::new();
        let stats = rewrite_meminfo(source.map(|s| Cursor::new(s.as_bytes())), &mut out, kb).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_emission_line() {
        assert_eq!(emission_line(16 * 1024 * 1024), "MemTotal: 16777216 kB\n");
    }

    #[test]
    fn test_replaces_in_place() {
        let (out, stats) = rewrite(Some(SAMPLE), 16777216);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "MemTotal: 16777216 kB");
        assert_eq!(lines[1], "MemFree:          312800 kB");
        assert_eq!(lines[3], "Buffers:          201324 kB");
        assert_eq!(lines.len(), 4);
        assert!(stats.replaced);
        assert!(!stats.appended);
        assert_eq!(stats.copied, 3);
    }

    #[test]
    fn test_missing_source_is_single_line() {
        let (out, stats) = rewrite(None, 1024);
        assert_eq!(out, "MemTotal: 1024 kB\n");
        assert!(stats.appended);
        assert_eq!(stats.copied, 0);
    }

    #[test]
    fn test_appends_when_label_absent() {
        let src = "MemFree: 10 kB\nCached: 20 kB\n";
        let (out, stats) = rewrite(Some(src), 99);
        assert_eq!(out, "MemFree: 10 kB\nCached: 20 kB\nMemTotal: 99 kB\n");
        assert!(stats.appended);
    }

    #[test]
    fn test_append_after_unterminated_last_line() {
        let (out, _) = rewrite(Some("MemFree: 10 kB"), 7);
        assert_eq!(out, "MemFree: 10 kB\nMemTotal: 7 kB\n");
    }

    #[test]
    fn test_duplicate_labels_suppressed() {
        let src = "MemTotal: 1 kB\nMemFree: 2 kB\nMemTotal: 3 kB\n";
        let (out, stats) = rewrite(Some(src), 5);
        assert_eq!(out, "MemTotal: 5 kB\nMemFree: 2 kB\n");
        assert_eq!(stats.suppressed, 1);
        assert_eq!(out.matches("MemTotal:").count(), 1);
    }

    #[test]
    fn test_empty_source_appends() {
        let (out, stats) = rewrite(Some(""), 5);
        assert_eq!(out, "MemTotal: 5 kB\n");
        assert!(stats.appended);
    }

    #[test]
    fn test_prefix_match_only() {
        // A label merely containing the text is not the total line
        let src = "HugeMemTotal: 4 kB\nMemTotalish 1\n";
        let (out, _) = rewrite(Some(src), 8);
        assert_eq!(out, "HugeMemTotal: 4 kB\nMemTotalish 1\nMemTotal: 8 kB\n");
    }

    #[test]
    fn test_non_utf8_lines_preserved() {
        let src: &[u8] = b"Weird: \xff\xfe kB\nMemTotal: 1 kB\n";
        let mut out = Vec::new();
        rewrite_meminfo(Some(Cursor::new(src)), &mut out, 2).unwrap();
        assert_eq!(out, b"Weird: \xff\xfe kB\nMemTotal: 2 kB\n".to_vec());
    }

    #[test]
    fn test_other_lines_keep_order() {
        let (out, _) = rewrite(Some(SAMPLE), 1);
        let kept: Vec<&str> = out.lines().filter(|l| !l.starts_with("MemTotal:")).collect();
        let expected: Vec<&str> = SAMPLE.lines().filter(|l| !l.starts_with("MemTotal:")).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_parse_total_kb() {
        assert_eq!(parse_total_kb(SAMPLE), Some(8056424));
        assert_eq!(parse_total_kb("MemFree: 1 kB\n"), None);
        assert_eq!(parse_total_kb(&emission_line(42)), Some(42));
    }
}
