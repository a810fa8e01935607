//! Bounded polling shared by the readiness waits.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::NetworkProbe;
use crate::domain::SessionError;

/// Call `check` every `interval` until it yields a value, giving up after
/// `bound` with [`SessionError::Timeout`].
///
/// An error from `check` ends the wait immediately.
///
/// # Errors
///
/// Returns the first error from `check`, or a timeout.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    bound: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let attempts = async {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if let Some(value) = check().await? {
                tracing::debug!(what, attempt, "ready");
                return Ok(value);
            }
            tracing::trace!(what, attempt, "not ready yet");
            tokio::time::sleep(interval).await;
        }
    };
    match tokio::time::timeout(bound, attempts).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::timeout(what, bound).into()),
    }
}

/// Wait until `host:port` accepts TCP connections.
///
/// Probe errors count as "not yet reachable".
///
/// # Errors
///
/// Returns [`SessionError::Timeout`] when `bound` elapses first.
pub async fn wait_for_port(
    probe: &impl NetworkProbe,
    what: &str,
    host: &str,
    port: u16,
    bound: Duration,
    interval: Duration,
) -> Result<()> {
    poll_until(what, bound, interval, move || async move {
        match probe.check_tcp_connectivity(host, port).await {
            Ok(true) => anyhow::Ok(Some(())),
            Ok(false) => Ok(None),
            Err(e) => {
                tracing::debug!(host, port, error = %e, "probe failed");
                Ok(None)
            }
        }
    })
    .await
}
