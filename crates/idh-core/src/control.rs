//! Cooperative shutdown: a one-shot flag set by SIGINT/SIGTERM and observed by
//! the batch loop, which stops admitting requests and performs the final flush.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared shutdown flag. Only the first `trigger` wins; later ones are no-ops.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns true only for the call that flipped the flag.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.notify.notify_waiters();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested (immediately if it already was).
    pub async fn triggered(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

/// Spawns a task that turns SIGINT (and SIGTERM on unix) into `trigger()`.
/// Repeated signals while shutting down are logged and ignored.
pub fn spawn_signal_listener(
    coordinator: Arc<ShutdownCoordinator>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let handle = tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            let name = tokio::select! {
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => "SIGINT",
                    Err(e) => {
                        tracing::warn!("SIGINT handler failed: {}", e);
                        return;
                    }
                },
                _ = terminate.recv() => "SIGTERM",
            };
            #[cfg(not(unix))]
            let name = match tokio::signal::ctrl_c().await {
                Ok(()) => "ctrl-c",
                Err(e) => {
                    tracing::warn!("ctrl-c handler failed: {}", e);
                    return;
                }
            };

            if coordinator.trigger() {
                tracing::info!("{} received, saving remaining data before exit", name);
            } else {
                tracing::debug!("{} received, shutdown already in progress", name);
            }
        }
    });
    Ok(handle)
}
