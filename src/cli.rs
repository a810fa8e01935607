//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::application::run_session;
use crate::domain::{EndReason, names};
use crate::infra::session_end;
use crate::output::TerminalReporter;

/// Prompt shown while the tunnel is up.
pub const PROMPT: &str = "press enter to destroy and disconnect";

/// Throwaway DigitalOcean droplet as a local SOCKS5 proxy.
///
/// Creates an SSH key and a droplet, opens `ssh -D` to it, and destroys
/// everything when you press enter, close stdin, or interrupt.
/// Requires DO_API_TOKEN in the environment.
#[derive(Parser)]
#[command(name = "dosockstunnel", version)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Path to the YAML config file
    #[arg(long, env = "DOSOCKS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Run one session and return the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if startup fails before any resource is created
    /// (missing token, unreadable or invalid configuration).
    pub async fn run(self) -> Result<i32> {
        let Cli {
            quiet,
            no_color,
            config,
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags { no_color, quiet },
            config,
        })?;
        let out = &app.output;

        let plan = names::plan(&app.config, &mut rand::thread_rng());
        out.header("dosockstunnel");
        out.kv("droplet ", &format!("{} ({}, {})", plan.instance_name, plan.region, plan.size));
        out.kv("ssh key ", &plan.key_name);
        out.kv("socks5  ", &format!("127.0.0.1:{}", plan.local_port));

        let reporter = TerminalReporter::new(out);
        let until_done = async {
            out.prompt(PROMPT);
            session_end::enter_pressed().await;
        };
        let report = run_session(
            app.ports(),
            &plan,
            &app.policy(),
            &reporter,
            until_done,
            session_end::interrupted(),
        )
        .await;

        match (&report.end, &report.failure) {
            (EndReason::Failed, Some(e)) => out.error(&format!("{e:#}")),
            (EndReason::Interrupted, _) => out.warn("session interrupted"),
            _ => {}
        }
        tracing::info!(
            end = ?report.end,
            reached = %report.reached,
            released = report.teardown.released.len(),
            failed = report.teardown.failed.len(),
            "session finished"
        );
        Ok(report.exit_code())
    }
}
