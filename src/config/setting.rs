use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment overrides. Secrets should never live in a committed config
/// file; these take precedence over whatever the file says.
pub const ENV_HUB_AUTH_TOKEN: &str = "TAILCLIP_HUB_AUTH_TOKEN";
pub const ENV_HUB_PORT: &str = "TAILCLIP_HUB_PORT";
pub const ENV_AGENT_AUTH_TOKEN: &str = "TAILCLIP_AGENT_AUTH_TOKEN";
pub const ENV_HUB_URL: &str = "TAILCLIP_HUB_URL";
pub const ENV_DEVICE_ID: &str = "TAILCLIP_DEVICE_ID";

/// Hub server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSetting {
    #[serde(default = "default_listen_ip")]
    pub listen_ip: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Shared secret all agents must present.
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Hard cap on the number of retained events. 0 disables the cap.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Age cap in days for retained events. 0 disables the cap.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_listen_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

fn default_sqlite_path() -> String {
    "tailclip.db".to_string()
}

fn default_history_limit() -> u32 {
    1000
}

fn default_retention_days() -> u32 {
    30
}

impl Default for HubSetting {
    fn default() -> Self {
        Self {
            listen_ip: default_listen_ip(),
            listen_port: default_listen_port(),
            auth_token: String::new(),
            sqlite_path: default_sqlite_path(),
            history_limit: default_history_limit(),
            retention_days: default_retention_days(),
        }
    }
}

impl HubSetting {
    /// Load from a JSON file, apply env overrides, validate.
    ///
    /// A missing file is not an error (defaults + env may be enough), an
    /// unparseable one is. Validation failures are fatal by design: the hub
    /// must not come up with a missing secret.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut setting = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str::<HubSetting>(&data).with_context(|| {
                format!("failed to parse hub config {}", path.as_ref().display())
            })?,
            Err(_) => HubSetting::default(),
        };

        if let Ok(token) = env::var(ENV_HUB_AUTH_TOKEN) {
            if !token.is_empty() {
                setting.auth_token = token;
            }
        }
        if let Ok(port) = env::var(ENV_HUB_PORT) {
            if let Ok(port) = port.parse::<u16>() {
                setting.listen_port = port;
            }
        }

        if setting.auth_token.is_empty() {
            bail!(
                "auth_token is required (set it in the config file or via {})",
                ENV_HUB_AUTH_TOKEN
            );
        }

        Ok(setting)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&path, data)
            .with_context(|| format!("failed to write hub config {}", path.as_ref().display()))?;
        Ok(())
    }
}

/// Per-device agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSetting {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    /// Base URL of the hub, e.g. http://100.64.0.1:8080
    #[serde(default)]
    pub hub_url: String,
    #[serde(default)]
    pub auth_token: String,
    /// Master switch; a disabled agent exits cleanly at startup.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_notify_enabled")]
    pub notify_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_notify_enabled() -> bool {
    true
}

impl Default for AgentSetting {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            device_name: String::new(),
            hub_url: String::new(),
            auth_token: String::new(),
            enabled: default_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
            notify_enabled: default_notify_enabled(),
        }
    }
}

impl AgentSetting {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut setting = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str::<AgentSetting>(&data).with_context(|| {
                format!("failed to parse agent config {}", path.as_ref().display())
            })?,
            Err(_) => AgentSetting::default(),
        };

        if let Ok(token) = env::var(ENV_AGENT_AUTH_TOKEN) {
            if !token.is_empty() {
                setting.auth_token = token;
            }
        }
        if let Ok(url) = env::var(ENV_HUB_URL) {
            if !url.is_empty() {
                setting.hub_url = url;
            }
        }
        if let Ok(id) = env::var(ENV_DEVICE_ID) {
            if !id.is_empty() {
                setting.device_id = id;
            }
        }

        if setting.device_id.is_empty() {
            bail!(
                "device_id is required (set it in the config file or via {})",
                ENV_DEVICE_ID
            );
        }
        if setting.device_name.is_empty() {
            bail!("device_name is required (set it in the config file)");
        }
        if setting.hub_url.is_empty() {
            bail!(
                "hub_url is required (set it in the config file or via {})",
                ENV_HUB_URL
            );
        }
        if setting.auth_token.is_empty() {
            bail!(
                "auth_token is required (set it in the config file or via {})",
                ENV_AGENT_AUTH_TOKEN
            );
        }
        if setting.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }

        Ok(setting)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&path, data)
            .with_context(|| format!("failed to write agent config {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
