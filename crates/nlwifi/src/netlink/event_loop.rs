//! Tokio driver for a [`Manager`].

use std::future::Future;

use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tokio::time::Instant as TokioInstant;
use tracing::debug;

use super::error::{Error, Result};
use super::manager::Manager;

/// Runs a manager on the current tokio task.
///
/// The manager's timers are read as system clock instants, so the manager
/// should use [`SystemClock`](super::clock::SystemClock) (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLoop;

impl EventLoop {
    /// Feed received datagrams and fire timers until `shutdown` resolves.
    ///
    /// Fails with [`Error::NotSupported`] if the transport has no descriptor
    /// to wait on. A transport error ends the loop.
    ///
    /// ```ignore
    /// let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    /// EventLoop::run_until(&mut manager, async move {
    ///     let _ = stop_rx.await;
    /// })
    /// .await?;
    /// ```
    pub async fn run_until<F: Future>(manager: &mut Manager, shutdown: F) -> Result<F::Output> {
        let fd = manager
            .raw_fd()
            .ok_or_else(|| Error::NotSupported("transport has no descriptor".into()))?;
        let fd = AsyncFd::with_interest(fd, Interest::READABLE)?;
        tokio::pin!(shutdown);

        loop {
            let fired = manager.run_expired_timers();
            if fired > 0 {
                debug!(fired, "timers fired");
            }
            let deadline = manager.next_deadline().map(TokioInstant::from_std);
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                output = &mut shutdown => return Ok(output),
                ready = fd.readable() => {
                    let mut guard = ready?;
                    manager.receive_available()?;
                    guard.clear_ready();
                }
                () = timer => {}
            }
        }
    }
}
