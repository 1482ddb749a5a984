//! Stop signal for the verifier node.
//!
//! The reconcile and sweep timers watch it between ticks, and the HTTP and
//! WebSocket servers use it for graceful shutdown. The flag is a
//! `tokio::sync::watch` value, so a task that subscribes after the signal
//! fired still sees it. Flushing the stores is left to `VerifierNode::stop`,
//! after every task has drained.

use std::future::Future;

use tokio::signal;
use tokio::sync::watch;

pub struct ShutdownController {
    stopping: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (stopping, _) = watch::channel(false);
        Self { stopping }
    }

    /// Receiver for a timer loop. Await [`stopped`] on it inside `select!`.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stopping.subscribe()
    }

    /// Completes once the node is stopping; handed to the servers.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move { stopped(&mut rx).await }
    }

    pub fn is_stopping(&self) -> bool {
        *self.stopping.borrow()
    }

    /// Begin stopping. Idempotent.
    pub fn shutdown(&self) {
        self.stopping.send_replace(true);
    }

    /// Wait for SIGTERM or SIGINT, then begin stopping.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, stopping verifier"),
            _ = terminate => tracing::info!("received SIGTERM, stopping verifier"),
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once the flag behind `rx` is set. A dropped controller counts as
/// stopping.
pub async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}
