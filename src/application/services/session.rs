//! Application service: one tunnel session from first key to last teardown.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All I/O is routed through injected port traits.

use std::future::Future;

use anyhow::Result;

use crate::application::ports::{
    KeyStore, NetworkProbe, ProgressReporter, RemoteProvider, TrustStore, TunnelManager,
    TunnelSpec,
};
use crate::application::services::teardown::{TeardownReport, TeardownStack};
use crate::application::services::{credential, instance, tunnel};
use crate::domain::{EndReason, InstanceRequest, ReadinessPolicy, SessionPlan, SessionState};

/// The collaborators a session drives.
pub struct SessionPorts<'a, P, K, T, S, N> {
    pub provider: &'a P,
    pub keys: &'a K,
    pub tunnels: &'a T,
    pub trust: &'a S,
    pub probe: &'a N,
}

/// What happened during a session.
#[derive(Debug)]
pub struct SessionReport {
    pub end: EndReason,
    /// Furthest lifecycle state entered before teardown began.
    pub reached: SessionState,
    pub teardown: TeardownReport,
    /// The acquisition error, when `end` is [`EndReason::Failed`].
    pub failure: Option<anyhow::Error>,
}

impl SessionReport {
    /// Process exit code for this outcome.
    ///
    /// `130` for an interrupt, `1` for a failed acquisition or an incomplete
    /// teardown, `0` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.end {
            EndReason::Interrupted => 130,
            EndReason::Failed => 1,
            EndReason::Completed if !self.teardown.is_clean() => 1,
            EndReason::Completed => 0,
        }
    }
}

/// Run a full session.
///
/// Acquires key, credential, droplet and tunnel in that order, then waits
/// for `until_done`. `interrupt` is raced against all of it: whichever
/// finishes first, control converges on a single teardown of everything
/// acquired so far. `until_done` is only polled once the tunnel is up.
pub async fn run_session<P, K, T, S, N>(
    ports: SessionPorts<'_, P, K, T, S, N>,
    plan: &SessionPlan,
    policy: &ReadinessPolicy,
    reporter: &impl ProgressReporter,
    until_done: impl Future<Output = ()>,
    interrupt: impl Future<Output = ()>,
) -> SessionReport
where
    P: RemoteProvider,
    K: KeyStore,
    T: TunnelManager,
    S: TrustStore,
    N: NetworkProbe,
{
    let mut stack = TeardownStack::new();
    let mut state = SessionState::Init;

    let (end, failure) = tokio::select! {
        biased;
        () = interrupt => (EndReason::Interrupted, None),
        result = acquire_and_hold(&ports, plan, policy, &mut stack, &mut state, reporter, until_done) => {
            match result {
                Ok(()) => (EndReason::Completed, None),
                Err(e) => (EndReason::Failed, Some(e)),
            }
        }
    };

    match (&end, &failure) {
        (EndReason::Interrupted, _) => {
            tracing::warn!(state = %state, "interrupted");
            reporter.warn(&format!("interrupted at state '{state}', tearing down"));
        }
        (_, Some(e)) => {
            tracing::error!(state = %state, error = %format!("{e:#}"), "session step failed");
            reporter.warn(&format!("failed at state '{state}': {e:#}"));
        }
        _ => {}
    }

    let reached = state;
    enter(&mut state, SessionState::TearingDown);
    let teardown = stack.run_all(reporter).await;
    enter(&mut state, SessionState::Done);

    if teardown.is_clean() {
        reporter.success(&format!(
            "released {} resource(s), nothing left behind",
            teardown.released.len()
        ));
    } else {
        for (label, error) in &teardown.failed {
            reporter.warn(&format!("NOT released: {label} ({error})"));
        }
    }

    SessionReport {
        end,
        reached,
        teardown,
        failure,
    }
}

async fn acquire_and_hold<'a, P, K, T, S, N>(
    ports: &SessionPorts<'a, P, K, T, S, N>,
    plan: &SessionPlan,
    policy: &ReadinessPolicy,
    stack: &mut TeardownStack<'a>,
    state: &mut SessionState,
    reporter: &impl ProgressReporter,
    until_done: impl Future<Output = ()>,
) -> Result<()>
where
    P: RemoteProvider,
    K: KeyStore,
    T: TunnelManager,
    S: TrustStore,
    N: NetworkProbe,
{
    let mut key = credential::generate(ports.keys, &plan.key_name, stack, reporter).await?;
    enter(state, SessionState::KeyGenerated);

    let ack = credential::register(ports.provider, ports.keys, &key, stack, reporter).await?;
    let credential_id = credential::confirm(ports.provider, &mut key, &ack, reporter).await?;
    enter(state, SessionState::KeyUploaded);

    let request = InstanceRequest {
        name: plan.instance_name.clone(),
        region: plan.region.clone(),
        image: plan.image.clone(),
        size: plan.size.clone(),
        credential_id,
        backups_enabled: false,
    };
    let instance_ack = instance::request(ports.provider, &request, stack, reporter).await?;
    enter(state, SessionState::InstanceCreating);

    let handle = instance::wait_ready(
        ports.provider,
        ports.probe,
        &request.name,
        &instance_ack,
        policy,
        reporter,
    )
    .await?;
    enter(state, SessionState::InstanceReady);

    tunnel::register_forget_host(ports.trust, &handle, stack);
    let spec = TunnelSpec {
        private_key: &key.private_key_path,
        user: &plan.ssh_user,
        address: &handle.address,
        local_port: plan.local_port,
    };
    tunnel::open(ports.tunnels, ports.probe, &spec, policy, stack, reporter).await?;
    enter(state, SessionState::TunnelActive);
    reporter.success(&format!(
        "SOCKS5 proxy ready on {}:{} via {}",
        tunnel::SOCKS_HOST,
        plan.local_port,
        handle.address
    ));

    until_done.await;
    Ok(())
}

fn enter(state: &mut SessionState, to: SessionState) {
    debug_assert!(state.can_transition_to(to), "{state} -> {to}");
    tracing::info!(from = %state, to = %to, "session state");
    *state = to;
}
