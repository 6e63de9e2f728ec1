//! Worker runtimes based on monoio
//!
//! Every stream socket runs on its own OS thread with a private
//! single-threaded monoio runtime. The legacy (epoll/kqueue) driver is used
//! so workers start on kernels without io_uring; the timer is always enabled
//! because stream loops race reads against stop signals and sleeps.

use monoio::{LegacyDriver, RuntimeBuilder};
use std::future::Future;
use std::io;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Settings for a dedicated worker thread
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Thread name, shown in logs with thread ids enabled
    pub thread_name: String,
    /// Worker stack size
    pub stack_size: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thread_name: "cryptobot-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
        }
    }
}

impl RuntimeConfig {
    pub fn named(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            ..Default::default()
        }
    }
}

/// Run a future to completion on a fresh single-threaded runtime
pub fn block_on<F>(future: F) -> io::Result<F::Output>
where
    F: Future,
{
    let mut runtime = RuntimeBuilder::<LegacyDriver>::new()
        .enable_timer()
        .build()?;
    Ok(runtime.block_on(future))
}

/// Spawn an OS thread that drives the future produced by `f` on its own runtime.
///
/// `f` runs on the new thread, so the future itself need not be `Send`.
pub fn spawn_worker<F, Fut>(config: RuntimeConfig, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    let mut builder = thread::Builder::new().name(config.thread_name.clone());
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    let name = config.thread_name;
    builder.spawn(move || {
        debug!("▶️  Worker {} starting", name);
        match block_on(f()) {
            Ok(()) => debug!("⏹️  Worker {} stopped", name),
            Err(e) => error!("Worker {} failed to build runtime: {}", name, e),
        }
    })
}
