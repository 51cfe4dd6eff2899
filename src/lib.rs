//! subreflow - retimes and reflows subtitle tracks to reading-speed limits
//!
//! The engine in [`optimize`] takes an ordered block list plus optional
//! speech timings and returns a compliant list. Everything around it
//! (SRT codec, speech JSON, stats, reports, tools) is plain I/O and
//! bookkeeping.

pub mod boundary;
pub mod config;
pub mod optimize;
pub mod report;
pub mod speech;
pub mod srt;
pub mod stats;
pub mod tools;
pub mod types;

use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `info`). Calling it twice
/// is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
