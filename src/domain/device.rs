use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// How long after the last heartbeat a device is still considered online.
const LIVENESS_WINDOW_MINUTES: i64 = 5;

/// A device participating in clipboard sync.
///
/// Records exist for observability: the core pipeline never routes on them.
/// The overlay-network address is kept verbatim from registration and is
/// not consulted anywhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub device_id: String,
    pub device_name: String,
    #[serde(rename = "tailscale_ip", default, skip_serializing_if = "Option::is_none")]
    pub network_address: Option<String>,
    #[serde(default = "Utc::now")]
    pub last_seen_utc: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Device {
    pub fn new(device_id: String, device_name: String, network_address: Option<String>) -> Self {
        Self {
            device_id,
            device_name,
            network_address,
            last_seen_utc: Utc::now(),
            enabled: true,
        }
    }

    /// True when the device has been seen within the liveness window.
    pub fn is_online(&self) -> bool {
        Utc::now() - self.last_seen_utc < Duration::minutes(LIVENESS_WINDOW_MINUTES)
    }

    pub fn touch(&mut self) {
        self.last_seen_utc = Utc::now();
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device(id: {}, name: {}, addr: {})",
            self.device_id,
            self.device_name,
            self.network_address.clone().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_online_fresh_device() {
        let device = Device::new("d1".to_string(), "Laptop".to_string(), None);
        assert!(device.is_online());
    }

    #[test]
    fn test_is_online_stale_device() {
        let mut device = Device::new("d1".to_string(), "Laptop".to_string(), None);
        device.last_seen_utc = Utc::now() - Duration::minutes(LIVENESS_WINDOW_MINUTES + 1);
        assert!(!device.is_online());
        device.touch();
        assert!(device.is_online());
    }

    #[test]
    fn test_wire_field_name_for_address() {
        let device = Device::new(
            "d1".to_string(),
            "Laptop".to_string(),
            Some("100.64.0.2".to_string()),
        );
        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"tailscale_ip\":\"100.64.0.2\""));
        let parsed: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.network_address.as_deref(), Some("100.64.0.2"));
    }

    #[test]
    fn test_deserialize_minimal_payload() {
        let json = r#"{"device_id":"d2","device_name":"Desktop"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert!(device.enabled);
        assert!(device.network_address.is_none());
    }
}
