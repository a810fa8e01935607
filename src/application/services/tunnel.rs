//! Application service: SOCKS tunnel bring-up.
//!
//! Imports only from `crate::domain` and `crate::application`.

use anyhow::{Context, Result};

use crate::application::ports::{
    NetworkProbe, ProgressReporter, TrustStore, TunnelManager, TunnelSpec,
};
use crate::application::services::teardown::TeardownStack;
use crate::application::services::wait::wait_for_port;
use crate::domain::{InstanceHandle, ReadinessPolicy};

/// Loopback address the SOCKS listener binds.
pub const SOCKS_HOST: &str = "127.0.0.1";

/// Register removal of the droplet's host key from the local trust store.
///
/// ssh records the host key on first connect, so this is registered before
/// the tunnel is launched.
pub fn register_forget_host<'a>(
    trust: &'a impl TrustStore,
    instance: &InstanceHandle,
    stack: &mut TeardownStack<'a>,
) {
    let address = instance.address.clone();
    stack.push(
        format!("forgetting host key for {address}"),
        move || async move { trust.forget_host(&address).await },
    );
}

/// Launch ssh, register its termination, then wait for the local SOCKS port.
///
/// # Errors
///
/// Returns [`crate::domain::SessionError::TunnelLaunch`] if ssh cannot be
/// started or exits during its grace period, or a timeout if the SOCKS port
/// never accepts connections.
pub async fn open<'a>(
    tunnels: &'a impl TunnelManager,
    probe: &impl NetworkProbe,
    spec: &TunnelSpec<'_>,
    policy: &ReadinessPolicy,
    stack: &mut TeardownStack<'a>,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let local_port = spec.local_port;
    reporter.step(&format!(
        "opening SOCKS tunnel via {}@{} on port {local_port}...",
        spec.user, spec.address
    ));
    let process = tunnels
        .launch(spec)
        .await
        .with_context(|| format!("launching tunnel to {}", spec.address))?;
    tracing::info!(pid = ?process.pid(), port = local_port, "tunnel launched");

    stack.push(
        format!("closing tunnel on port {local_port}"),
        move || async move { tunnels.kill(process).await },
    );

    wait_for_port(
        probe,
        &format!("SOCKS listener on {SOCKS_HOST}:{local_port}"),
        SOCKS_HOST,
        local_port,
        policy.socks_timeout,
        policy.poll_interval,
    )
    .await?;
    Ok(())
}
