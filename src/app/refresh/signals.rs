//! Shutdown plumbing for `serve`
//!
//! A single broadcast channel carries one stop request to the refresh engine
//! and the HTTP server. The request comes from Ctrl-C, from SIGTERM, or from
//! `serve` itself when the server exits first. Dropping every sender counts
//! as a stop request too.

use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Channel shared by the engine and the server. Subscribe before spawning.
pub fn create_shutdown_channel() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
    broadcast::channel(1)
}

/// Resolve once a stop is broadcast or the last sender is dropped
pub async fn wait_for_shutdown_signal(mut shutdown_rx: broadcast::Receiver<()>) {
    let _ = shutdown_rx.recv().await;
}

/// Resolve on the first Ctrl-C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires; the other
/// one still works.
async fn termination_requested() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, stopping refresh engine and server"),
        _ = sigterm => info!("SIGTERM received, stopping refresh engine and server"),
    }
}

/// Forwards OS termination signals onto the shutdown channel
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<()>,
}

impl SignalHandler {
    pub fn new(shutdown_tx: broadcast::Sender<()>) -> Self {
        Self { shutdown_tx }
    }

    /// Spawn the listener. Abort the handle once `serve` has stopped.
    pub fn setup(&self) -> JoinHandle<()> {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            termination_requested().await;
            let _ = shutdown_tx.send(());
        })
    }
}
