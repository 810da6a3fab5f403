use anyhow::{Context, Result};
use log::{error, info};
use std::env;
use std::sync::Arc;
use std::time::Duration;

use tailclip::application::{DeviceManager, EventLogManager};
use tailclip::config::HubSetting;
use tailclip::core::ContentHandlerRegistry;
use tailclip::infrastructure::connection::Broadcaster;
use tailclip::infrastructure::storage::db::pool::DB_POOL;
use tailclip::infrastructure::web::{self, HubDeps};
use tailclip::utils::logging;

const DEFAULT_CONFIG_PATH: &str = "hub-config.json";

/// Cadence of the retention sweep. The count cap is enforced amortized on
/// insert; only the age cap needs a timer.
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(e) = run().await {
        error!("hub failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let setting = HubSetting::load(&config_path)
        .with_context(|| format!("failed to load hub config from {}", config_path))?;
    info!("hub config loaded from {}", config_path);

    DB_POOL
        .init(&setting.sqlite_path)
        .with_context(|| format!("failed to initialize storage at {}", setting.sqlite_path))?;
    info!("storage initialized at {}", setting.sqlite_path);

    let event_log = Arc::new(EventLogManager::new(
        setting.history_limit,
        setting.retention_days,
    ));
    let deps = HubDeps {
        auth_token: setting.auth_token.clone(),
        event_log: event_log.clone(),
        devices: Arc::new(DeviceManager::new()),
        broadcaster: Arc::new(Broadcaster::new()),
        handlers: Arc::new(ContentHandlerRegistry::with_defaults()),
    };

    // Low-frequency sweep for the age cap.
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = event_log.prune_by_age() {
                error!("retention sweep failed: {:#}", e);
            }
        }
    });

    let result = web::run(&setting, deps, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await;

    sweeper.abort();
    DB_POOL.close();
    info!("storage closed");
    result
}
