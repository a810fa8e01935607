//! Shared test helpers: a fully mocked session harness and fast policies.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use dosockstunnel::application::{SessionPorts, SessionReport, run_session};
use dosockstunnel::domain::{ReadinessPolicy, SessionPlan};

use crate::mocks::{
    CollectingReporter, MockKeyStore, MockProbe, MockProvider, MockTrust, MockTunnels, Recorder,
};

pub const KEY_NAME: &str = "amber_birch_cedar_delta";
pub const INSTANCE_NAME: &str = "echo-fjord";
pub const LOCAL_PORT: u16 = 9050;

pub fn plan() -> SessionPlan {
    SessionPlan {
        key_name: KEY_NAME.to_string(),
        instance_name: INSTANCE_NAME.to_string(),
        local_port: LOCAL_PORT,
        region: "nyc3".to_string(),
        image: "ubuntu-24-04-x64".to_string(),
        size: "s-1vcpu-512mb-10gb".to_string(),
        ssh_user: "root".to_string(),
    }
}

/// Millisecond-scale bounds so timeouts trip quickly.
pub fn fast_policy() -> ReadinessPolicy {
    ReadinessPolicy {
        poll_interval: Duration::from_millis(1),
        instance_timeout: Duration::from_millis(200),
        ssh_timeout: Duration::from_millis(200),
        socks_timeout: Duration::from_millis(200),
        launch_grace: Duration::from_millis(0),
    }
}

/// Every port mocked and wired to one recorder.
///
/// Replace individual fields to inject failures before calling [`Harness::run`].
pub struct Harness {
    pub rec: Recorder,
    pub provider: MockProvider,
    pub keys: MockKeyStore,
    pub tunnels: MockTunnels,
    pub trust: MockTrust,
    pub probe: MockProbe,
    pub reporter: CollectingReporter,
}

impl Harness {
    pub fn new() -> Self {
        let rec = Recorder::default();
        Self {
            provider: MockProvider::new(&rec),
            keys: MockKeyStore::new(&rec),
            tunnels: MockTunnels::new(&rec),
            trust: MockTrust::new(&rec),
            probe: MockProbe::new(&rec),
            reporter: CollectingReporter::default(),
            rec,
        }
    }

    pub async fn run(
        &self,
        until_done: impl Future<Output = ()>,
        interrupt: impl Future<Output = ()>,
    ) -> SessionReport {
        let ports = SessionPorts {
            provider: &self.provider,
            keys: &self.keys,
            tunnels: &self.tunnels,
            trust: &self.trust,
            probe: &self.probe,
        };
        run_session(
            ports,
            &plan(),
            &fast_policy(),
            &self.reporter,
            until_done,
            interrupt,
        )
        .await
    }

    /// Run until the user ends the session, with no interrupt.
    pub async fn run_to_completion(&self) -> SessionReport {
        self.run(std::future::ready(()), std::future::pending()).await
    }
}

/// Full teardown of a session that reached an active tunnel, in release order.
pub fn full_release_order() -> Vec<String> {
    use crate::mocks::{CREDENTIAL_ID, INSTANCE_ADDRESS, INSTANCE_ID};
    vec![
        format!("kill {LOCAL_PORT}"),
        format!("forget_host {INSTANCE_ADDRESS}"),
        format!("destroy_instance {INSTANCE_ID}"),
        format!("destroy_credential {CREDENTIAL_ID}"),
        format!("remove {KEY_NAME}"),
    ]
}
