//! Shutdown on SIGINT/SIGTERM.

use async_std::channel::{self, Receiver};
use futures::StreamExt;
use paas::Result;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_async_std::{Handle, Signals};
use tracing::info;

/// Spawns a task that closes the returned channel on the first termination
/// signal. Every clone of the receiver wakes up, so one channel stops all
/// server loops of the process.
///
/// # Returns
/// * `Result<(Receiver<()>, Handle)>` - Shutdown receiver and the handle
///   that unregisters the signal handlers
pub fn shutdown_channel() -> Result<(Receiver<()>, Handle)> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);

    async_std::task::spawn(async move {
        if let Some(signal) = signals.next().await {
            info!("Received signal {}, shutting down", signal);
            shutdown_tx.close();
        }
    });

    Ok((shutdown_rx, handle))
}
