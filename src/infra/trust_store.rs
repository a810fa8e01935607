//! Known-hosts cleanup: implements the `TrustStore` port with `ssh-keygen -R`.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ports::{CommandRunner, TrustStore};

pub struct SshKeygenTrustStore<R> {
    runner: R,
    known_hosts: Option<PathBuf>,
}

impl<R: CommandRunner> SshKeygenTrustStore<R> {
    /// `known_hosts` selects the file; `ssh-keygen` uses its own default when
    /// it is `None`.
    #[must_use]
    pub fn new(runner: R, known_hosts: Option<PathBuf>) -> Self {
        Self {
            runner,
            known_hosts,
        }
    }

    fn args<'a>(&'a self, address: &'a str) -> Vec<std::borrow::Cow<'a, str>> {
        let mut args = vec!["-R".into(), address.into()];
        if let Some(path) = &self.known_hosts {
            args.push("-f".into());
            args.push(path.to_string_lossy());
        }
        args
    }
}

impl<R: CommandRunner> TrustStore for SshKeygenTrustStore<R> {
    async fn forget_host(&self, address: &str) -> Result<()> {
        let args = self.args(address);
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let out = self.runner.run("ssh-keygen", &args).await?;
        anyhow::ensure!(
            out.status.success(),
            "ssh-keygen -R {address} failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
        tracing::debug!(address, "host key removed from known_hosts");
        Ok(())
    }
}
