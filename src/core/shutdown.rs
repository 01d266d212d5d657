//! # OS termination signals.
//!
//! Unix: `SIGINT`, `SIGTERM`, `SIGQUIT`. Elsewhere: Ctrl-C.

/// Completes when a termination signal arrives; `Err` if listeners cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Like [`wait_for_shutdown_signal`], but never completes when no listener could be installed.
pub async fn signal_or_pending() {
    if let Err(e) = wait_for_shutdown_signal().await {
        tracing::warn!(error = %e, "cannot listen for termination signals");
        std::future::pending::<()>().await;
    }
}
