//! Signal-triggered graceful shutdown.

use std::io;

use tokio::signal::unix::{SignalKind, signal};

/// Resolves when SIGINT, SIGTERM or SIGHUP arrives, naming the signal.
pub async fn wait_for_signal() -> io::Result<&'static str> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sighup.recv() => "SIGHUP",
    };
    Ok(name)
}
