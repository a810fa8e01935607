//! Application service: droplet creation and readiness.
//!
//! Imports only from `crate::domain` and `crate::application`.

use anyhow::{Context, Result};

use crate::application::ports::{NetworkProbe, ProgressReporter, RemoteProvider};
use crate::application::services::teardown::TeardownStack;
use crate::application::services::wait::{poll_until, wait_for_port};
use crate::domain::{InstanceHandle, InstanceRequest, ReadinessPolicy, provider};

/// Port probed to decide the droplet accepts SSH.
pub const SSH_PORT: u16 = 22;

/// Create the droplet and register its destruction under the acknowledged id.
///
/// # Errors
///
/// Returns an error if the provider rejects the create request. Nothing is
/// registered in that case.
pub async fn request<'a>(
    provider: &'a impl RemoteProvider,
    request: &InstanceRequest,
    stack: &mut TeardownStack<'a>,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    reporter.step(&format!(
        "creating droplet {} ({}, {}, {})...",
        request.name, request.region, request.size, request.image
    ));
    let ack = provider
        .create_instance(request)
        .await
        .with_context(|| format!("creating droplet {}", request.name))?;
    tracing::info!(name = %request.name, id = %ack, "droplet acknowledged");

    let id = ack.clone();
    stack.push(
        format!("destroying droplet {} ({ack})", request.name),
        move || async move { provider.destroy_instance(&id).await },
    );
    Ok(ack)
}

/// Wait until the droplet called `name` is active with a public IPv4
/// address, then until it accepts TCP connections on port 22.
///
/// Transient listing failures are retried until the bound; an identifier
/// that disagrees with `ack` is fatal.
///
/// # Errors
///
/// Returns [`crate::domain::SessionError::Timeout`] when either wait exceeds
/// its bound, or a [`crate::domain::ProviderError`] on identifier mismatch.
pub async fn wait_ready(
    provider: &impl RemoteProvider,
    probe: &impl NetworkProbe,
    name: &str,
    ack: &str,
    policy: &ReadinessPolicy,
    reporter: &impl ProgressReporter,
) -> Result<InstanceHandle> {
    reporter.step(&format!("waiting for droplet {name} to become active..."));
    let what = format!("droplet {name} to become active");
    let handle = poll_until(
        &what,
        policy.instance_timeout,
        policy.poll_interval,
        move || async move {
            let listed = match provider.list_instances().await {
                Ok(listed) => listed,
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "listing droplets failed, retrying");
                    return anyhow::Ok(None);
                }
            };
            match provider::find_instance(&listed, name, ack) {
                Some(instance) => {
                    tracing::debug!(name, status = ?instance.status, "droplet status");
                    Ok(provider::ready_handle(instance, ack)?)
                }
                None => Ok(None),
            }
        },
    )
    .await?;

    reporter.step(&format!("waiting for ssh on {}...", handle.address));
    wait_for_port(
        probe,
        &format!("ssh on {}", handle.address),
        &handle.address,
        SSH_PORT,
        policy.ssh_timeout,
        policy.poll_interval,
    )
    .await?;
    reporter.success(&format!(
        "droplet {} ready at {} (id {})",
        handle.name, handle.address, handle.remote_id
    ));
    Ok(handle)
}

