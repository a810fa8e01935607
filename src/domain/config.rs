//! Domain types and validators for dosockstunnel configuration.
//!
//! Pure functions only: no I/O and no async.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::SessionError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Lowest local port the tunnel may bind (unprivileged range).
pub const MIN_LOCAL_PORT: u16 = 1025;
/// Highest local port the tunnel may bind.
pub const MAX_LOCAL_PORT: u16 = 65535;
/// Default RSA modulus size in bits.
pub const DEFAULT_KEY_BITS: usize = 4096;
/// Smallest RSA modulus accepted from configuration.
pub const MIN_KEY_BITS: usize = 2048;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.config/dosockstunnel/config.yaml`.
///
/// Every field has a default, so an absent or empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TunnelConfig {
    /// DigitalOcean API settings.
    pub api: ApiConfig,
    /// Droplet placement and sizing.
    pub droplet: DropletConfig,
    /// Local key material settings.
    pub keys: KeyConfig,
    /// SSH tunnel settings.
    pub tunnel: TunnelSettings,
    /// Bounded readiness waits.
    pub readiness: ReadinessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the provider API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.digitalocean.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DropletConfig {
    /// Region slug, e.g. `nyc3`.
    pub region: String,
    /// Image slug, e.g. `ubuntu-24-04-x64`.
    pub image: String,
    /// Size slug, e.g. `s-1vcpu-512mb-10gb`.
    pub size: String,
}

impl Default for DropletConfig {
    fn default() -> Self {
        Self {
            region: "nyc3".to_string(),
            image: "ubuntu-24-04-x64".to_string(),
            size: "s-1vcpu-512mb-10gb".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyConfig {
    /// Directory for the transient keypair. Defaults to the system temp dir.
    pub dir: Option<PathBuf>,
    /// RSA modulus size in bits.
    pub bits: usize,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            dir: None,
            bits: DEFAULT_KEY_BITS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TunnelSettings {
    /// Remote login user.
    pub user: String,
    /// Fixed local SOCKS port. Chosen at random when unset.
    pub port: Option<u16>,
    /// Let ssh background itself (`-f`) instead of keeping it as a child.
    pub detach: bool,
    /// known_hosts file to clean up. `ssh-keygen` picks its default when unset.
    pub known_hosts: Option<PathBuf>,
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: None,
            detach: false,
            known_hosts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Delay between readiness probes, in seconds.
    pub poll_interval_secs: u64,
    /// Bound on the droplet reaching `active` with an address, in seconds.
    pub instance_timeout_secs: u64,
    /// Bound on the droplet accepting SSH connections, in seconds.
    pub ssh_timeout_secs: u64,
    /// Bound on the local SOCKS listener accepting connections, in seconds.
    pub socks_timeout_secs: u64,
    /// How long a freshly launched tunnel must stay alive, in milliseconds.
    pub launch_grace_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            instance_timeout_secs: 300,
            ssh_timeout_secs: 180,
            socks_timeout_secs: 60,
            launch_grace_ms: 1500,
        }
    }
}

/// Duration-typed view of [`ReadinessConfig`] handed to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub poll_interval: Duration,
    pub instance_timeout: Duration,
    pub ssh_timeout: Duration,
    pub socks_timeout: Duration,
    pub launch_grace: Duration,
}

impl From<&ReadinessConfig> for ReadinessPolicy {
    fn from(cfg: &ReadinessConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
            instance_timeout: Duration::from_secs(cfg.instance_timeout_secs),
            ssh_timeout: Duration::from_secs(cfg.ssh_timeout_secs),
            socks_timeout: Duration::from_secs(cfg.socks_timeout_secs),
            launch_grace: Duration::from_millis(cfg.launch_grace_ms),
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns [`SessionError::InvalidConfig`] naming the first offending field.
pub fn validate_config(cfg: &TunnelConfig) -> Result<()> {
    let invalid = |msg: String| -> Result<()> { Err(SessionError::InvalidConfig(msg).into()) };

    if cfg.keys.bits < MIN_KEY_BITS {
        return invalid(format!(
            "keys.bits must be at least {MIN_KEY_BITS} (got {})",
            cfg.keys.bits
        ));
    }
    if let Some(port) = cfg.tunnel.port
        && port < MIN_LOCAL_PORT
    {
        return invalid(format!(
            "tunnel.port must be in {MIN_LOCAL_PORT}..={MAX_LOCAL_PORT} (got {port})"
        ));
    }
    for (key, value) in [
        ("droplet.region", &cfg.droplet.region),
        ("droplet.image", &cfg.droplet.image),
        ("droplet.size", &cfg.droplet.size),
        ("tunnel.user", &cfg.tunnel.user),
        ("api.base_url", &cfg.api.base_url),
    ] {
        if value.trim().is_empty() {
            return invalid(format!("{key} must not be empty"));
        }
    }
    let r = &cfg.readiness;
    for (key, value) in [
        ("readiness.poll_interval_secs", r.poll_interval_secs),
        ("readiness.instance_timeout_secs", r.instance_timeout_secs),
        ("readiness.ssh_timeout_secs", r.ssh_timeout_secs),
        ("readiness.socks_timeout_secs", r.socks_timeout_secs),
        ("api.request_timeout_secs", cfg.api.request_timeout_secs),
    ] {
        if value == 0 {
            return invalid(format!("{key} must be greater than zero"));
        }
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
