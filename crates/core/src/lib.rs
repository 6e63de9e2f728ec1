//! # CryptoBot Core
//!
//! Shared building blocks for the Binance demo client.
//!
//! - **Exact decimals** - `Fixed` keeps exchange strings lossless
//! - **Worker runtimes** - one monoio runtime per stream thread
//! - **Timing** - millisecond timestamps for signed requests
//! - **Unified logging** - tracing with `RUST_LOG` filtering
//! - **ID generation** - nanoid client order ids

pub mod fixed;
pub mod id_gen;
pub mod logging;
pub mod runtime;
pub mod timing;

// Re-export commonly used items
pub use fixed::{Fixed, FixedError};
pub use id_gen::generate_id_with_prefix;
pub use logging::init_logging;
pub use runtime::{RuntimeConfig, spawn_worker};
pub use timing::{PerfTimer, Timestamp, nanos, timestamp_ms};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixed::{Fixed, FixedError};
    pub use crate::id_gen::generate_id_with_prefix;
    pub use crate::logging::init_logging;
    pub use crate::runtime::{RuntimeConfig, block_on, spawn_worker};
    pub use crate::timing::{PerfTimer, Timestamp, nanos, timestamp_ms};

    // Common external types
    pub use chrono::{DateTime, Utc};
    pub use monoio;
    pub use serde::{Deserialize, Serialize};
}
