//! Cooperative shutdown
//!
//! A [`ShutdownSignal`] is a cloneable flag backed by a [`CancellationToken`].
//! OS signals, tests and the ingestion server all trigger or observe the same
//! token; the collection loop checks it between cycles and while sleeping.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Calling this more than once is harmless.
    pub fn trigger(&self, reason: &str) {
        if !self.token.is_cancelled() {
            info!(event = "shutdown_requested", reason, "shutdown requested");
            self.token.cancel();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` when the sleep was interrupted.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

/// Wait for SIGINT or SIGTERM (Ctrl+C on non-unix platforms).
///
/// Returns the name of the received signal.
#[cfg(unix)]
pub async fn wait_for_os_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!("failed to install unix signal handlers ({e}), falling back to ctrl-c");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

#[cfg(not(unix))]
pub async fn wait_for_os_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        // never resolve; shutdown can still be triggered programmatically
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

/// Trigger `shutdown` when the process receives a termination signal.
pub fn listen_for_os_signals(shutdown: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_os_signal() => shutdown.trigger(signal),
            _ = shutdown.triggered() => {}
        }
    })
}
