//! Logging Setup
//!
//! Entry points emit `tracing` records: `debug` for every dispatch with the
//! row split, dtype and device, and `warn` when arguments are rejected.
//! [`init_logger`] installs a compact subscriber for binaries and tests that
//! want to see them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `info`, or at
/// `debug` when `verbose`.
pub fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("fused_layer_norm=debug,layer_norm_bench=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("fused_layer_norm=info,layer_norm_bench=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .compact(),
        )
        .init();
}
