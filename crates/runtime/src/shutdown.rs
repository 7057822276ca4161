use std::future::Future;

use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, warn};

/// Resolves once the process receives SIGINT or SIGTERM.
///
/// If no handler can be installed the failure is logged and the future never resolves.
pub async fn shutdown_signal() {
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(%e, "failed to install SIGTERM handler");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => debug!("Received SIGINT signal"),
            Err(e) => {
                warn!(%e, "failed to listen for SIGINT");
                term.recv().await;
                debug!("Received SIGTERM signal");
            }
        },
        _ = term.recv() => debug!("Received SIGTERM signal"),
    }
}

/// Run `fut` until it completes or `shutdown` resolves.
///
/// Returns `None` when interrupted, after running `on_shutdown`. The interrupted future is dropped,
/// so anything it holds (gate permits included) is released before this returns.
pub async fn run_until_shutdown<F, S, C>(fut: F, shutdown: S, on_shutdown: C) -> Option<F::Output>
where
    F: Future,
    S: Future<Output = ()>,
    C: FnOnce(),
{
    tokio::select! {
        // NOTE: wrap with a `Box` so we don't allocate a
        // huge future state machine on the stack.
        result = Box::pin(fut) => Some(result),
        () = shutdown => {
            on_shutdown();
            None
        }
    }
}
