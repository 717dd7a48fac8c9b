mod checks;
mod client;
mod config;
mod netinfo;
mod scheduler;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use crate::checks::CheckTable;
use crate::client::RegistryClient;
use crate::config::Config;
use crate::scheduler::Scheduler;

fn has_root_privilege() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("livemon_agent=info")),
        )
        .init();

    tracing::info!("Starting livemon-agent");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/livemon/agent.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!(
        "Loaded config from {} ({} services)",
        config_path,
        config.services.len()
    );

    if config.general.require_root && !has_root_privilege() {
        bail!("This agent is configured to require root privileges");
    }

    let client = RegistryClient::new(&config.general.server_url, &config.auth.access_token);
    let sched = Scheduler::new(config.services, CheckTable::builtin(), client)?;

    let cancel = CancellationToken::new();
    let sched_cancel = cancel.clone();
    let sleep_interval = config.general.sleep_interval;
    let sched_handle = tokio::spawn(async move {
        sched.run(sleep_interval, sched_cancel).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");
    cancel.cancel();
    let _ = sched_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
