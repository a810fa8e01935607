//! Recording mocks of every session port.
//!
//! All mocks append to one shared [`Recorder`], so tests can assert the
//! exact interleaving of acquisition and teardown calls across ports.

#![allow(dead_code, clippy::expect_used)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use dosockstunnel::application::ports::{
    KeyStore, NetworkProbe, ProgressReporter, RemoteProvider, TrustStore, TunnelManager,
    TunnelProcess, TunnelSpec,
};
use dosockstunnel::domain::{
    CredentialRequest, InstanceRequest, InstanceStatus, KeyMaterial, RemoteCredential,
    RemoteInstance,
};

pub const CREDENTIAL_ID: &str = "123456";
pub const INSTANCE_ID: &str = "999999";
pub const INSTANCE_ADDRESS: &str = "192.168.1.100";

// ── Recorder ─────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().expect("recorder lock").push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().expect("recorder lock").clone()
    }

    /// Events starting with `prefix`, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.matching(prefix).len()
    }

    /// Teardown calls only, in the order they happened.
    pub fn releases(&self) -> Vec<String> {
        const RELEASES: [&str; 5] = [
            "kill ",
            "forget_host ",
            "destroy_instance ",
            "destroy_credential ",
            "remove ",
        ];
        self.events()
            .into_iter()
            .filter(|e| RELEASES.iter().any(|p| e.starts_with(p)))
            .collect()
    }
}

fn fail_if(fail: &HashSet<&'static str>, op: &'static str) -> Result<()> {
    if fail.contains(op) {
        anyhow::bail!("injected failure: {op}");
    }
    Ok(())
}

// ── Provider ─────────────────────────────────────────────────────────────────

/// Stateful provider: created resources show up in listings.
pub struct MockProvider {
    rec: Recorder,
    fail: HashSet<&'static str>,
    /// Listed credential id differs from the acknowledged one.
    pub mismatched_listing: bool,
    /// Number of listings in which the droplet is still `new`.
    pub pending_listings: usize,
    /// The droplet never becomes active.
    pub never_active: bool,
    credential_name: Mutex<Option<String>>,
    instance_name: Mutex<Option<String>>,
    instance_listings: Mutex<usize>,
    pub instance_requests: Mutex<Vec<InstanceRequest>>,
}

impl MockProvider {
    pub fn new(rec: &Recorder) -> Self {
        Self {
            rec: rec.clone(),
            fail: HashSet::new(),
            mismatched_listing: false,
            pending_listings: 0,
            never_active: false,
            credential_name: Mutex::new(None),
            instance_name: Mutex::new(None),
            instance_listings: Mutex::new(0),
            instance_requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing(mut self, op: &'static str) -> Self {
        self.fail.insert(op);
        self
    }
}

impl RemoteProvider for MockProvider {
    async fn create_credential(&self, request: &CredentialRequest) -> Result<String> {
        self.rec.record(format!("create_credential {}", request.name));
        fail_if(&self.fail, "create_credential")?;
        *self.credential_name.lock().expect("lock") = Some(request.name.clone());
        Ok(CREDENTIAL_ID.to_string())
    }

    async fn list_credentials(&self) -> Result<Vec<RemoteCredential>> {
        self.rec.record("list_credentials");
        fail_if(&self.fail, "list_credentials")?;
        let mut listed = vec![RemoteCredential {
            id: "111".to_string(),
            name: "someone_elses_key".to_string(),
        }];
        if let Some(name) = self.credential_name.lock().expect("lock").clone() {
            let id = if self.mismatched_listing { "222" } else { CREDENTIAL_ID };
            listed.push(RemoteCredential {
                id: id.to_string(),
                name,
            });
        }
        Ok(listed)
    }

    async fn destroy_credential(&self, id: &str) -> Result<()> {
        self.rec.record(format!("destroy_credential {id}"));
        fail_if(&self.fail, "destroy_credential")
    }

    async fn create_instance(&self, request: &InstanceRequest) -> Result<String> {
        self.rec.record(format!("create_instance {}", request.name));
        self.instance_requests
            .lock()
            .expect("lock")
            .push(request.clone());
        fail_if(&self.fail, "create_instance")?;
        *self.instance_name.lock().expect("lock") = Some(request.name.clone());
        Ok(INSTANCE_ID.to_string())
    }

    async fn list_instances(&self) -> Result<Vec<RemoteInstance>> {
        self.rec.record("list_instances");
        fail_if(&self.fail, "list_instances")?;
        let mut listed = vec![RemoteInstance {
            id: "1".to_string(),
            name: "other-droplet".to_string(),
            status: InstanceStatus::Active,
            ipv4: vec!["10.0.0.1".to_string()],
        }];
        let mut seen = self.instance_listings.lock().expect("lock");
        *seen += 1;
        if let Some(name) = self.instance_name.lock().expect("lock").clone() {
            let active = !self.never_active && *seen > self.pending_listings;
            listed.push(RemoteInstance {
                id: INSTANCE_ID.to_string(),
                name,
                status: if active {
                    InstanceStatus::Active
                } else {
                    InstanceStatus::New
                },
                ipv4: if active {
                    vec![INSTANCE_ADDRESS.to_string()]
                } else {
                    Vec::new()
                },
            });
        }
        Ok(listed)
    }

    async fn destroy_instance(&self, id: &str) -> Result<()> {
        self.rec.record(format!("destroy_instance {id}"));
        fail_if(&self.fail, "destroy_instance")
    }
}

// ── Key store ────────────────────────────────────────────────────────────────

pub struct MockKeyStore {
    rec: Recorder,
    fail: HashSet<&'static str>,
    generate_delay: Duration,
}

impl MockKeyStore {
    pub fn new(rec: &Recorder) -> Self {
        Self {
            rec: rec.clone(),
            fail: HashSet::new(),
            generate_delay: Duration::ZERO,
        }
    }

    /// Generation takes `delay` before it writes anything.
    #[must_use]
    pub fn slow(mut self, delay: Duration) -> Self {
        self.generate_delay = delay;
        self
    }

    #[must_use]
    pub fn failing(mut self, op: &'static str) -> Self {
        self.fail.insert(op);
        self
    }
}

impl KeyStore for MockKeyStore {
    fn paths(&self, name: &str) -> KeyMaterial {
        KeyMaterial::at(Path::new("/tmp/mock-keys"), name)
    }

    async fn generate(&self, name: &str) -> Result<KeyMaterial> {
        self.rec.record(format!("generate {name}"));
        tokio::time::sleep(self.generate_delay).await;
        fail_if(&self.fail, "generate")?;
        let mut key = self.paths(name);
        key.fingerprint = "SHA256:mock".to_string();
        Ok(key)
    }

    async fn read_public_key(&self, key: &KeyMaterial) -> Result<String> {
        fail_if(&self.fail, "read_public_key")?;
        Ok(format!("ssh-rsa AAAAB3NzaC1yc2EAAAADAQAB {}\n", key.name))
    }

    async fn remove(&self, key: &KeyMaterial) -> Result<()> {
        self.rec.record(format!("remove {}", key.name));
        fail_if(&self.fail, "remove")
    }
}

// ── Tunnel ───────────────────────────────────────────────────────────────────

pub struct MockTunnels {
    rec: Recorder,
    fail: HashSet<&'static str>,
    launch_delay: Duration,
}

impl MockTunnels {
    pub fn new(rec: &Recorder) -> Self {
        Self {
            rec: rec.clone(),
            fail: HashSet::new(),
            launch_delay: Duration::ZERO,
        }
    }

    /// Launch sits in its grace period for `delay` before returning.
    #[must_use]
    pub fn slow(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    #[must_use]
    pub fn failing(mut self, op: &'static str) -> Self {
        self.fail.insert(op);
        self
    }
}

impl TunnelManager for MockTunnels {
    async fn launch(&self, spec: &TunnelSpec<'_>) -> Result<TunnelProcess> {
        self.rec.record(format!(
            "launch {}@{} -D {} -i {}",
            spec.user,
            spec.address,
            spec.local_port,
            spec.private_key.display()
        ));
        tokio::time::sleep(self.launch_delay).await;
        fail_if(&self.fail, "launch")?;
        Ok(TunnelProcess {
            command_line: vec!["ssh".to_string()],
            local_port: spec.local_port,
            child: None,
        })
    }

    async fn kill(&self, tunnel: TunnelProcess) -> Result<()> {
        self.rec.record(format!("kill {}", tunnel.local_port));
        fail_if(&self.fail, "kill")
    }
}

// ── Trust store ──────────────────────────────────────────────────────────────

pub struct MockTrust {
    rec: Recorder,
    fail: HashSet<&'static str>,
}

impl MockTrust {
    pub fn new(rec: &Recorder) -> Self {
        Self {
            rec: rec.clone(),
            fail: HashSet::new(),
        }
    }

    #[must_use]
    pub fn failing(mut self, op: &'static str) -> Self {
        self.fail.insert(op);
        self
    }
}

impl TrustStore for MockTrust {
    async fn forget_host(&self, address: &str) -> Result<()> {
        self.rec.record(format!("forget_host {address}"));
        fail_if(&self.fail, "forget_host")
    }
}

// ── Network probe ────────────────────────────────────────────────────────────

pub struct MockProbe {
    rec: Recorder,
    /// Ports that never accept connections.
    pub closed: HashSet<u16>,
}

impl MockProbe {
    pub fn new(rec: &Recorder) -> Self {
        Self {
            rec: rec.clone(),
            closed: HashSet::new(),
        }
    }

    #[must_use]
    pub fn closed(mut self, port: u16) -> Self {
        self.closed.insert(port);
        self
    }
}

impl NetworkProbe for MockProbe {
    async fn check_tcp_connectivity(&self, host: &str, port: u16) -> Result<bool> {
        self.rec.record(format!("probe {host}:{port}"));
        Ok(!self.closed.contains(&port))
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

/// Collects reporter output for assertions.
#[derive(Default)]
pub struct CollectingReporter {
    pub lines: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.lines
            .lock()
            .expect("lock")
            .iter()
            .filter_map(|l| l.strip_prefix("warn: ").map(ToString::to_string))
            .collect()
    }
}

impl ProgressReporter for CollectingReporter {
    fn step(&self, message: &str) {
        self.lines.lock().expect("lock").push(format!("step: {message}"));
    }

    fn success(&self, message: &str) {
        self.lines.lock().expect("lock").push(format!("success: {message}"));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().expect("lock").push(format!("warn: {message}"));
    }
}
