//! dosockstunnel - throwaway DigitalOcean droplet as a SOCKS5 proxy

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dosockstunnel::cli::Cli;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let code = match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };
    // Exit without dropping the runtime: a pending stdin read would block it.
    std::process::exit(code);
}
