//! The two ways a running session ends: the user asks, or a signal arrives.

use tokio::io::AsyncBufReadExt;

/// Resolves on Ctrl-C, SIGTERM or SIGHUP.
///
/// Handlers are installed on first poll. If a handler cannot be installed
/// that source is ignored rather than treated as an interrupt.
pub async fn interrupted() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let terminate = async {
            match signal(SignalKind::terminate()) {
                Ok(mut s) => {
                    s.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        let hangup = async {
            match signal(SignalKind::hangup()) {
                Ok(mut s) => {
                    s.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot install SIGHUP handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            () = ctrl_c() => tracing::info!("received Ctrl-C"),
            () = terminate => tracing::info!("received SIGTERM"),
            () = hangup => tracing::info!("received SIGHUP"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
        tracing::info!("received Ctrl-C");
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

/// Resolves when the user presses enter or stdin is closed.
///
/// The stdin read cannot be cancelled, so a process that stops waiting
/// early must exit with `std::process::exit` rather than by dropping the
/// runtime.
pub async fn enter_pressed() {
    let mut line = String::new();
    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    match stdin.read_line(&mut line).await {
        Ok(0) => tracing::info!("stdin closed"),
        Ok(_) => tracing::debug!("enter pressed"),
        Err(e) => tracing::warn!(error = %e, "reading stdin failed"),
    }
}
