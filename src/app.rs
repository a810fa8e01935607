//! Application context: everything a session needs, built once from the CLI.
//!
//! `AppContext` bundles the output context, the loaded configuration and the
//! production adapters, so `Cli::run` only wires them together.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::application::SessionPorts;
use crate::application::ports::ConfigStore;
use crate::domain::{ReadinessPolicy, SessionError, TunnelConfig};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::digitalocean::DigitalOceanClient;
use crate::infra::keys::LocalKeyStore;
use crate::infra::network::TokioNetworkProbe;
use crate::infra::trust_store::SshKeygenTrustStore;
use crate::infra::tunnel::SshTunnelManager;
use crate::output::OutputContext;

/// Environment variable holding the DigitalOcean API token.
pub const TOKEN_ENV: &str = "DO_API_TOKEN";

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    /// Config file override (`--config` / `DOSOCKS_CONFIG`).
    pub config: Option<PathBuf>,
}

/// Unified application context.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    pub config: TunnelConfig,
    pub provider: DigitalOceanClient,
    pub keys: LocalKeyStore,
    pub tunnels: SshTunnelManager<TokioCommandRunner>,
    pub trust: SshKeygenTrustStore<TokioCommandRunner>,
    pub probe: TokioNetworkProbe,
}

/// Session aliases for the production adapters.
pub type ProductionPorts<'a> = SessionPorts<
    'a,
    DigitalOceanClient,
    LocalKeyStore,
    SshTunnelManager<TokioCommandRunner>,
    SshKeygenTrustStore<TokioCommandRunner>,
    TokioNetworkProbe,
>;

impl AppContext {
    /// Load configuration, read the token and build every adapter.
    ///
    /// Nothing remote or on disk is created here.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingToken`] when `DO_API_TOKEN` is unset or
    /// empty, or an error if the configuration cannot be loaded.
    pub fn new(flags: AppFlags) -> Result<Self> {
        let output = OutputContext::new(flags.output.no_color, flags.output.quiet);
        let store = YamlConfigStore::locate(flags.config)?;
        let config = store.load()?;
        tracing::debug!(path = %store.path().display(), "configuration loaded");

        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(SessionError::MissingToken)?;

        let provider = DigitalOceanClient::new(
            &config.api.base_url,
            token,
            Duration::from_secs(config.api.request_timeout_secs),
        )?;
        let key_dir = config.keys.dir.clone().unwrap_or_else(std::env::temp_dir);
        let keys = LocalKeyStore::new(key_dir, config.keys.bits);
        let tunnels = SshTunnelManager::new(
            TokioCommandRunner::default(),
            config.tunnel.detach,
            ReadinessPolicy::from(&config.readiness).launch_grace,
        );
        let trust = SshKeygenTrustStore::new(
            TokioCommandRunner::default(),
            config.tunnel.known_hosts.clone(),
        );

        Ok(Self {
            output,
            config,
            provider,
            keys,
            tunnels,
            trust,
            probe: TokioNetworkProbe,
        })
    }

    /// Borrow the adapters as session ports.
    #[must_use]
    pub fn ports(&self) -> ProductionPorts<'_> {
        SessionPorts {
            provider: &self.provider,
            keys: &self.keys,
            tunnels: &self.tunnels,
            trust: &self.trust,
            probe: &self.probe,
        }
    }

    /// Readiness bounds from the configuration.
    #[must_use]
    pub fn policy(&self) -> ReadinessPolicy {
        ReadinessPolicy::from(&self.config.readiness)
    }
}
