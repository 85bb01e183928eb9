//! Global, explicitly-initialized logging sink.
//!
//! The runtime never initializes logging on first use — that would be
//! a hidden singleton. Embedding applications call [`init`] once at
//! startup; everything else in the crate just emits `tracing` events
//! at the appropriate severity (debug/info/warn/error).

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs a `stderr`-writing `tracing` subscriber for the whole
/// process. Safe to call more than once; only the first call takes
/// effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init();
    });
}
