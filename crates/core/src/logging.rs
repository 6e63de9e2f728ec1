//! Unified logging
//!
//! tracing-subscriber with an `RUST_LOG` env filter, defaulting to `info`.
//! Safe to call from the demo binary, examples and tests alike.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber once
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize with a fallback directive used when `RUST_LOG` is unset
pub fn init_logging_with_default(default_directive: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .finish();

        // A subscriber set elsewhere (e.g. by a test harness) wins
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!("📝 Initialized tracing logging");
        }
    });
}

#[macro_export]
macro_rules! log_order {
    ($action:expr, $order_id:expr, $symbol:expr) => {
        tracing::info!("📋 ORDER {}: {} ({})", $action, $order_id, $symbol);
    };
}

#[macro_export]
macro_rules! log_error {
    ($operation:expr, $error:expr) => {
        tracing::error!("❌ {} failed: {}", $operation, $error);
    };
}
