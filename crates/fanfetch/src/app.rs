//! Default application controller and monitor.

use crate::{AppController, Error, Monitor};
use portable_atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared RUNNING/STOPPED state of a consumer process.
///
/// Clones share the same state. Stopping is terminal: it cancels the root
/// [`CancellationToken`], which ends every continuous fetch loop started under
/// it.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    stopped: AtomicBool,
    token: CancellationToken,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AppController for AppState {
    fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            tracing::info!("Stopping application");
        }
        self.inner.token.cancel();
    }

    fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    fn shutdown_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }
}

/// A [`Monitor`] that logs noticed errors through `tracing`.
///
/// Without the `tracing` feature it discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMonitor;

impl Monitor for TracingMonitor {
    fn notice_error(&self, _source: &str, _error: &Error) {
        #[cfg(feature = "tracing")]
        tracing::error!(source = _source, "{_error}");
    }
}
