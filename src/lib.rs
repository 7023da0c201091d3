pub mod cli;
pub mod core;
pub mod scene_extractor;

use tracing_subscriber::EnvFilter;

/// Installs the log backend, `info` unless `RUST_LOG` says otherwise.
/// Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
