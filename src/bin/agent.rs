use anyhow::{Context, Result};
use log::{error, info};
use std::env;
use std::sync::Arc;

use tailclip::config::AgentSetting;
use tailclip::core::TailClipAgent;
use tailclip::infrastructure::clipboard::LocalClipboard;
use tailclip::infrastructure::network::SyncClient;
use tailclip::infrastructure::notification::LogNotifier;
use tailclip::utils::logging;

const DEFAULT_CONFIG_PATH: &str = "agent-config.json";

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(e) = run().await {
        error!("agent failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let setting = AgentSetting::load(&config_path)
        .with_context(|| format!("failed to load agent config from {}", config_path))?;
    info!(
        "agent config loaded: device={} ({}), hub={}",
        setting.device_id, setting.device_name, setting.hub_url
    );

    if !setting.enabled {
        info!("agent is disabled in config, exiting");
        return Ok(());
    }

    let clipboard = Arc::new(LocalClipboard::new().context("failed to open system clipboard")?);
    let sync = Arc::new(SyncClient::new(&setting)?);
    let notifier = Arc::new(LogNotifier::new());

    let agent = TailClipAgent::new(setting, clipboard, sync, notifier);
    agent.run().await?;

    info!("agent stopped");
    Ok(())
}
