//! SSH SOCKS tunnel: implements the `TunnelManager` port on top of a
//! `CommandRunner`.
//!
//! Attached mode keeps the ssh child and signals its process group on
//! teardown. Detached mode (`ssh -f`) has no handle once ssh forks, so the
//! process is found again by its exact command line.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::application::ports::{CommandRunner, TunnelManager, TunnelProcess, TunnelSpec};
use crate::domain::{SessionError, ssh};

/// How long a terminated tunnel may take to exit before it is killed.
pub const KILL_GRACE: Duration = Duration::from_secs(5);
/// Bound on `ssh -f` authenticating and backgrounding itself.
pub const DETACH_TIMEOUT: Duration = Duration::from_secs(60);

pub struct SshTunnelManager<R> {
    runner: R,
    detach: bool,
    launch_grace: Duration,
}

impl<R: CommandRunner> SshTunnelManager<R> {
    #[must_use]
    pub fn new(runner: R, detach: bool, launch_grace: Duration) -> Self {
        Self {
            runner,
            detach,
            launch_grace,
        }
    }

    async fn launch_attached(
        &self,
        mut child: tokio::process::Child,
        command_line: Vec<String>,
        local_port: u16,
    ) -> Result<TunnelProcess> {
        match tokio::time::timeout(self.launch_grace, child.wait()).await {
            Err(_still_running) => {
                forward_stderr(&mut child);
                Ok(TunnelProcess {
                    command_line,
                    local_port,
                    child: Some(child),
                })
            }
            Ok(Ok(status)) => {
                let stderr = drain_stderr(&mut child).await;
                Err(SessionError::TunnelLaunch(format!("ssh exited during launch ({status}){stderr}"))
                    .into())
            }
            Ok(Err(e)) => Err(SessionError::TunnelLaunch(format!("waiting for ssh: {e}")).into()),
        }
    }

    async fn launch_detached(
        &self,
        mut child: tokio::process::Child,
        command_line: Vec<String>,
        local_port: u16,
    ) -> Result<TunnelProcess> {
        let status = tokio::time::timeout(DETACH_TIMEOUT, child.wait())
            .await
            .map_err(|_| SessionError::timeout("ssh to background itself", DETACH_TIMEOUT))?
            .map_err(|e| SessionError::TunnelLaunch(format!("waiting for ssh: {e}")))?;
        if !status.success() {
            let stderr = drain_stderr(&mut child).await;
            return Err(SessionError::TunnelLaunch(format!("ssh -f failed ({status}){stderr}")).into());
        }
        Ok(TunnelProcess {
            command_line,
            local_port,
            child: None,
        })
    }

    async fn kill_attached(&self, mut child: tokio::process::Child) -> Result<()> {
        if let Some(status) = child.try_wait().context("checking tunnel status")? {
            tracing::info!(%status, "tunnel had already exited");
            return Ok(());
        }
        let Some(pid) = child.id() else {
            return Ok(());
        };
        // The child leads its own process group, so pgid == pid.
        if let Err(e) = self.signal_group(pid).await {
            tracing::warn!(pid, error = %format!("{e:#}"), "signalling tunnel group failed");
        }
        match tokio::time::timeout(KILL_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status.context("waiting for tunnel to exit")?;
                tracing::info!(pid, %status, "tunnel stopped");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(pid, "tunnel ignored SIGTERM, killing");
                child.kill().await.context("killing tunnel")
            }
        }
    }

    async fn kill_detached(&self, command_line: &[String]) -> Result<()> {
        let pattern = ssh::pgrep_pattern(command_line);
        let found = self.runner.run("pgrep", &["-f", &pattern]).await?;
        let pids = ssh::parse_pids(&String::from_utf8_lossy(&found.stdout));
        if pids.is_empty() {
            tracing::warn!("no tunnel process matches the recorded command line");
            return Ok(());
        }
        let own_group = std::process::id();
        for pid in pids {
            let pid_arg = pid.to_string();
            let ps = self.runner.run("ps", &["-o", "pgid=", "-p", &pid_arg]).await?;
            let pgid = ssh::parse_pids(&String::from_utf8_lossy(&ps.stdout))
                .first()
                .copied()
                .filter(|&pgid| pgid != own_group);
            match pgid {
                Some(pgid) => self.signal_group(pgid).await?,
                None => self.signal_pid(pid).await?,
            }
        }
        Ok(())
    }

    async fn signal_group(&self, pgid: u32) -> Result<()> {
        let target = format!("-{pgid}");
        let out = self.runner.run("kill", &["-TERM", "--", &target]).await?;
        anyhow::ensure!(
            out.status.success(),
            "kill -TERM -- {target} failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
        Ok(())
    }

    async fn signal_pid(&self, pid: u32) -> Result<()> {
        let target = pid.to_string();
        let out = self.runner.run("kill", &["-TERM", &target]).await?;
        anyhow::ensure!(out.status.success(), "kill -TERM {target} failed");
        Ok(())
    }
}

impl<R: CommandRunner> TunnelManager for SshTunnelManager<R> {
    async fn launch(&self, spec: &TunnelSpec<'_>) -> Result<TunnelProcess> {
        let command_line = ssh::tunnel_command_line(
            spec.private_key,
            spec.user,
            spec.address,
            spec.local_port,
            self.detach,
        );
        let Some((program, args)) = command_line.split_first() else {
            return Err(SessionError::TunnelLaunch("empty command line".to_string()).into());
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let child = self
            .runner
            .spawn(program, &args)
            .map_err(|e| SessionError::TunnelLaunch(format!("{e:#}")))?;
        tracing::debug!(pid = ?child.id(), detach = self.detach, "ssh spawned");

        if self.detach {
            self.launch_detached(child, command_line, spec.local_port).await
        } else {
            self.launch_attached(child, command_line, spec.local_port).await
        }
    }

    async fn kill(&self, tunnel: TunnelProcess) -> Result<()> {
        match tunnel.child {
            Some(child) => self.kill_attached(child).await,
            None => self.kill_detached(&tunnel.command_line).await,
        }
    }
}

/// Keep reading a running tunnel's stderr so ssh never blocks on a full
/// pipe. Lines go to the debug log; the task ends when ssh closes stderr.
fn forward_stderr(child: &mut tokio::process::Child) {
    let Some(stderr) = child.stderr.take() else {
        return;
    };
    let pid = child.id();
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    tracing::debug!(?pid, line = %text.trim_end(), "ssh stderr");
                }
            }
        }
    });
}

/// Whatever ssh wrote to stderr, prefixed for appending to an error message.
async fn drain_stderr(child: &mut tokio::process::Child) -> String {
    let Some(mut stderr) = child.stderr.take() else {
        return String::new();
    };
    let mut buf = String::new();
    let _ = tokio::time::timeout(Duration::from_secs(1), stderr.read_to_string(&mut buf)).await;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
