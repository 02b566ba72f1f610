//! Synthesized memory-info file
//!
//! Creates `<temp_dir>/<prefix>XXXXXX` with mkstemp, fills it from the
//! real memory-info file through `fakemem_core::meminfo::rewrite_meminfo`,
//! and makes it read-only for everyone. Any failure after creation removes
//! the file again, so an `Err` never leaves anything on disk.

use std::ffi::{CString, OsString};
use std::fs::{File, Permissions};
use std::io::{BufReader, BufWriter, Write};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};

use fakemem_core::constants::SYNTH_MODE;
use fakemem_core::error::{FakememError, FakememResult};
use fakemem_core::meminfo::{rewrite_meminfo, RewriteStats};
use fakemem_core::{kdebug, ShimConfig};
use nix::errno::Errno;

/// A successfully written synthesized file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    /// Where the file lives
    pub path: PathBuf,
    /// How the content was derived
    pub stats: RewriteStats,
}

impl Synthesized {
    /// Path as a C string, for publishing to the interceptors
    pub fn c_path(&self) -> FakememResult<CString> {
        CString::new(self.path.as_os_str().as_bytes()).map_err(|_| FakememError::InvalidPath)
    }
}

/// Builds the synthesized file described by a `ShimConfig`
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: ShimConfig,
}

impl Synthesizer {
    pub fn new(config: ShimConfig) -> Self {
        Self { config }
    }

    /// Create, fill and seal a new synthesized file.
    pub fn synthesize(&self) -> FakememResult<Synthesized> {
        self.config.validate()?;

        let (file, path) = make_temp(&self.config.temp_template())?;

        match self.fill(file) {
            Ok(stats) => {
                kdebug!(
                    "synthesized {} (copied={}, replaced={}, appended={})",
                    path.display(),
                    stats.copied,
                    stats.replaced,
                    stats.appended
                );
                Ok(Synthesized { path, stats })
            }
            Err(e) => {
                let _ = nix::unistd::unlink(path.as_path());
                Err(e)
            }
        }
    }

    fn fill(&self, file: File) -> FakememResult<RewriteStats> {
        // An unreadable source is expected (no procfs, sandboxes): emit the
        // single-line file instead
        let source = match File::open(&self.config.source) {
            Ok(f) => Some(BufReader::new(f)),
            Err(e) => {
                kdebug!("{} unreadable ({}), writing minimal file", self.config.source.display(), e);
                None
            }
        };

        let mut out = BufWriter::new(file);
        let stats = rewrite_meminfo(source, &mut out, self.config.fake_kb())?;
        out.flush().map_err(|e| FakememError::write(&e))?;
        let file = out.into_inner().map_err(|e| FakememError::write(e.error()))?;

        file.set_permissions(Permissions::from_mode(SYNTH_MODE))
            .map_err(|e| FakememError::Permissions(e.raw_os_error().unwrap_or(libc::EIO)))?;

        Ok(stats)
    }
}

/// mkstemp wrapper: exclusive creation, owner read/write until sealed
fn make_temp(template: &Path) -> FakememResult<(File, PathBuf)> {
    let mut buf = CString::new(template.as_os_str().as_bytes())
        .map_err(|_| FakememError::InvalidPath)?
        .into_bytes_with_nul();

    // SAFETY: buf is a writable NUL-terminated template ending in XXXXXX
    let fd = unsafe { libc::mkstemp(buf.as_mut_ptr().cast::<libc::c_char>()) };
    if fd < 0 {
        return Err(FakememError::TempFile(Errno::last() as i32));
    }

    buf.pop(); // NUL
    let path = PathBuf::from(OsString::from_vec(buf));
    // SAFETY: mkstemp returned a fresh descriptor that nothing else owns
    let file = unsafe { File::from_raw_fd(fd) };
    Ok((file, path))
}
