//! Bounded teardown for the server's shutdown path.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Await `close` for at most `limit`.
///
/// Returns `false` when the limit elapsed first. The pending close is
/// dropped in that case and the process is free to exit.
pub async fn close_within<F>(close: F, limit: Duration) -> bool
where
    F: Future<Output = ()>,
{
    match tokio::time::timeout(limit, close).await {
        Ok(()) => true,
        Err(_) => {
            warn!(
                subsystem = "api",
                limit_ms = limit.as_millis() as u64,
                "Store did not close in time; exiting anyway"
            );
            false
        }
    }
}
