//! Process attach / detach
//!
//! Attach: eager resolution (best-effort), then synthesis of the
//! memory-info file and publication of its path. Detach: clear the path and
//! unlink the file. Neither ever fails the host process; problems are logged
//! (when logging is enabled) and the file channel degrades to pass-through.

use fakemem_core::{kdebug, kerror, kinfo, kprint, ktrace, kwarn, Entry, FakememError, FakememResult, ShimConfig};
use nix::NixPath;

use crate::real::{RealEntryPoints, RESOLVER};
use crate::state::{SynthPath, SYNTH_PATH};
use crate::synth::Synthesizer;

/// Attach hook body for the process-wide state.
pub fn attach() {
    attach_with(&RESOLVER, &SYNTH_PATH, ShimConfig::new());
}

/// Detach hook body for the process-wide state.
pub fn detach() {
    detach_from(&SYNTH_PATH);
}

/// Attach against explicit state. Returns whether a synthesized path is
/// recorded afterwards.
pub fn attach_with<R: RealEntryPoints + ?Sized>(real: &R, synth: &SynthPath, config: ShimConfig) -> bool {
    kprint::init();

    let resolved = real.resolve_all();
    if resolved < Entry::COUNT {
        kdebug!("resolved {}/{} entry points at attach", resolved, Entry::COUNT);
    }

    if synth.is_set() {
        return true;
    }

    let synthesized = match Synthesizer::new(config).synthesize() {
        Ok(s) => s,
        Err(e) => {
            kwarn!("meminfo synthesis failed, /proc/meminfo passes through: {}", e);
            return false;
        }
    };

    let c_path = match synthesized.c_path() {
        Ok(p) => p,
        Err(e) => {
            kerror!("unusable synthesized path {}: {}", synthesized.path.display(), e);
            discard(synthesized.path.as_path());
            return false;
        }
    };

    if let Err(rejected) = synth.publish(c_path) {
        // Lost a race with another attach; keep theirs
        kdebug!("path already recorded, dropping {}", rejected.to_string_lossy());
        discard(rejected.as_c_str());
        return true;
    }
    kinfo!("serving /proc/meminfo from {}", synthesized.path.display());
    true
}

/// Detach against explicit state. Returns whether a file was removed.
pub fn detach_from(synth: &SynthPath) -> bool {
    let Some(path) = synth.take() else {
        ktrace!("detach: nothing to remove");
        return false;
    };

    match remove_synthesized(path.as_c_str()) {
        Ok(()) => true,
        Err(e) => {
            kwarn!("failed to remove {}: {}", path.to_string_lossy(), e);
            false
        }
    }
}

/// Unlink a synthesized file
pub fn remove_synthesized<P: ?Sized + NixPath>(path: &P) -> FakememResult<()> {
    nix::unistd::unlink(path).map_err(|e| FakememError::Unlink(e as i32))
}

fn discard<P: ?Sized + NixPath>(path: &P) {
    if let Err(e) = remove_synthesized(path) {
        kerror!("stray synthesized file left behind: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real::DlsymResolver;
    use crate::testutil::scratch_dir;
    use std::ffi::CStr;
    use std::path::PathBuf;

    fn recorded(synth: &SynthPath) -> PathBuf {
        synth
            .with(|p| p.map(|c: &CStr| PathBuf::from(c.to_string_lossy().into_owned())))
            .unwrap()
    }

    #[test]
    fn test_attach_then_detach() {
        let dir = scratch_dir("lifecycle");
        let synth = SynthPath::new();
        let resolver = DlsymResolver::new();

        assert!(attach_with(&resolver, &synth, ShimConfig::new().temp_dir(&dir)));
        let path = recorded(&synth);
        assert!(path.starts_with(&dir));
        assert!(path.exists());
        assert!(resolver.is_cached(Entry::Sysinfo));

        assert!(detach_from(&synth));
        assert!(!path.exists());
        assert!(!synth.is_set());

        // Idempotent
        assert!(!detach_from(&synth));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_second_attach_keeps_first_path() {
        let dir = scratch_dir("reattach");
        let synth = SynthPath::new();
        let resolver = DlsymResolver::new();

        assert!(attach_with(&resolver, &synth, ShimConfig::new().temp_dir(&dir)));
        let first = recorded(&synth);
        assert!(attach_with(&resolver, &synth, ShimConfig::new().temp_dir(&dir)));
        assert_eq!(recorded(&synth), first);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

        detach_from(&synth);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_synthesis_leaves_path_empty() {
        let dir = scratch_dir("nosynth");
        let synth = SynthPath::new();
        let resolver = DlsymResolver::new();

        let config = ShimConfig::new().temp_dir(dir.join("missing"));
        assert!(!attach_with(&resolver, &synth, config));
        assert!(!synth.is_set());
        // Resolution still happened
        assert!(resolver.is_cached(Entry::Sysconf));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_detach_reports_vanished_file() {
        let dir = scratch_dir("vanished");
        let synth = SynthPath::new();
        let resolver = DlsymResolver::new();

        assert!(attach_with(&resolver, &synth, ShimConfig::new().temp_dir(&dir)));
        let path = recorded(&synth);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(remove_synthesized(path.as_path()), Err(FakememError::Unlink(libc::ENOENT)));
        // Path is cleared even though the unlink failed
        assert!(!detach_from(&synth));
        assert!(!synth.is_set());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
