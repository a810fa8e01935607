//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`
//! or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{
    CredentialRequest, InstanceRequest, KeyMaterial, RemoteCredential, RemoteInstance,
    TunnelConfig,
};

// ── Remote Provider Port ──────────────────────────────────────────────────────

/// Remote resource API: account SSH keys and droplets.
///
/// `create_*` return the identifier the provider acknowledged, so a
/// compensating destroy can be registered before anything else happens.
#[allow(async_fn_in_trait)]
pub trait RemoteProvider {
    /// Upload a public key. Returns the acknowledged key id.
    async fn create_credential(&self, request: &CredentialRequest) -> Result<String>;
    /// List every SSH key on the account.
    async fn list_credentials(&self) -> Result<Vec<RemoteCredential>>;
    /// Delete an SSH key by id. Deleting an absent key succeeds.
    async fn destroy_credential(&self, id: &str) -> Result<()>;
    /// Create a droplet. Returns the acknowledged droplet id.
    async fn create_instance(&self, request: &InstanceRequest) -> Result<String>;
    /// List every droplet on the account.
    async fn list_instances(&self) -> Result<Vec<RemoteInstance>>;
    /// Destroy a droplet by id. Destroying an absent droplet succeeds.
    async fn destroy_instance(&self, id: &str) -> Result<()>;
}

// ── Key Store Port ────────────────────────────────────────────────────────────

/// Local transient keypair storage.
#[allow(async_fn_in_trait)]
pub trait KeyStore {
    /// Where the keypair called `name` lives, whether or not it exists yet.
    fn paths(&self, name: &str) -> KeyMaterial;
    /// Generate and persist a fresh keypair called `name`.
    ///
    /// On error, no file belonging to `name` is left behind.
    async fn generate(&self, name: &str) -> Result<KeyMaterial>;
    /// Read the OpenSSH public key line for `key`.
    async fn read_public_key(&self, key: &KeyMaterial) -> Result<String>;
    /// Delete both key files. Files that are already gone are not an error.
    async fn remove(&self, key: &KeyMaterial) -> Result<()>;
}

// ── Tunnel Port ───────────────────────────────────────────────────────────────

/// Parameters for a SOCKS tunnel launch.
#[derive(Debug, Clone, Copy)]
pub struct TunnelSpec<'a> {
    pub private_key: &'a Path,
    pub user: &'a str,
    pub address: &'a str,
    pub local_port: u16,
}

/// A launched SOCKS forwarding process.
#[derive(Debug)]
pub struct TunnelProcess {
    /// Exact argument vector, program first.
    pub command_line: Vec<String>,
    pub local_port: u16,
    /// The ssh child when it was kept attached. `None` once ssh has
    /// backgrounded itself.
    pub child: Option<tokio::process::Child>,
}

impl TunnelProcess {
    /// PID of the attached child, if any.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(tokio::process::Child::id)
    }
}

/// Launches and stops the local SOCKS forwarding process.
#[allow(async_fn_in_trait)]
pub trait TunnelManager {
    /// Start the tunnel and confirm it survived its launch grace period.
    async fn launch(&self, spec: &TunnelSpec<'_>) -> Result<TunnelProcess>;
    /// Stop the tunnel and everything it spawned. Stopping a process that
    /// has already exited succeeds.
    async fn kill(&self, tunnel: TunnelProcess) -> Result<()>;
}

// ── Trust Store Port ──────────────────────────────────────────────────────────

/// Local SSH known-hosts maintenance.
#[allow(async_fn_in_trait)]
pub trait TrustStore {
    /// Remove every known-hosts entry for `address`.
    async fn forget_host(&self, address: &str) -> Result<()>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Spawn a program in its own process group without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Network Probe Port ────────────────────────────────────────────────────────

/// Abstracts network connectivity checks so application services can be tested
/// without real network access.
#[allow(async_fn_in_trait)]
pub trait NetworkProbe {
    /// Check TCP connectivity to the given host and port.
    async fn check_tcp_connectivity(&self, host: &str, port: u16) -> Result<bool>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, returning defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<TunnelConfig>;

    /// Location of the configuration file.
    fn path(&self) -> &Path;
}

