//! # fakemem-runtime
//!
//! Linux implementation of the fakemem shim.
//!
//! This crate provides:
//! - Real entry point resolution through `dlsym(RTLD_NEXT)` (`real`)
//! - The process-wide synthesized file path (`state`)
//! - The synthesized memory-info file (`synth`)
//! - The three reporting interceptors (`intercept`)
//! - Attach/detach actions (`lifecycle`)
//! - Cross-channel consistency reports (`report`)
//!
//! Nothing here exports C symbols; the `fakemem` cdylib does that.

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod real;
        pub mod state;
        pub mod synth;
        pub mod intercept;
        pub mod lifecycle;
        pub mod report;

        pub use real::{DlsymResolver, RealEntryPoints, RESOLVER};
        pub use state::{SynthPath, SYNTH_PATH};
        pub use synth::{Synthesized, Synthesizer};
        pub use intercept::Interceptor;
        pub use lifecycle::{attach, detach};
        pub use report::{ChannelReport, Channels, ProcessChannels};
    } else {
        compile_error!("fakemem only supports Linux");
    }
}

/// Set the calling thread's errno
#[cfg(target_os = "linux")]
#[inline]
pub(crate) fn set_errno(code: libc::c_int) {
    // SAFETY: __errno_location always returns the current thread's errno slot
    unsafe { *libc::__errno_location() = code };
}
