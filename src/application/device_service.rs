use anyhow::Result;
use chrono::Utc;
use log::debug;

use crate::domain::device::Device;
use crate::infrastructure::storage::db::dao::device as device_dao;
use crate::infrastructure::storage::db::models::device::NewDevice;
use crate::infrastructure::storage::db::pool::DB_POOL;
use crate::utils::helpers::to_storage_timestamp;

/// Registry of devices known to the hub.
///
/// Purely observational: nothing in the sync pipeline routes on it.
/// Records are never destroyed; participation is controlled by the
/// `enabled` flag the device itself reports.
pub struct DeviceManager;

impl DeviceManager {
    pub fn new() -> Self {
        DeviceManager
    }

    /// Insert-or-replace the registration. Doubles as the heartbeat:
    /// `last_seen_utc` is always stamped with the current time, whatever
    /// the payload claimed.
    pub fn register(&self, mut device: Device) -> Result<Device> {
        device.touch();
        let mut conn = DB_POOL.get_connection()?;
        device_dao::upsert_device(&mut conn, &NewDevice::from(&device))?;
        Ok(device)
    }

    /// Refresh liveness for a device that just pushed an event. Unknown
    /// devices are left alone; registration is what creates records.
    pub fn touch(&self, device_id: &str) -> Result<()> {
        let now = to_storage_timestamp(&Utc::now());
        let mut conn = DB_POOL.get_connection()?;
        let touched = device_dao::touch_device(&mut conn, device_id, &now)?;
        if touched == 0 {
            debug!("push from unregistered device {}", device_id);
        }
        Ok(())
    }

    pub fn get_all(&self) -> Result<Vec<Device>> {
        let mut conn = DB_POOL.get_connection()?;
        let rows = device_dao::get_all_devices(&mut conn)?;
        rows.into_iter().map(Device::try_from).collect()
    }

    pub fn get(&self, device_id: &str) -> Result<Option<Device>> {
        let mut conn = DB_POOL.get_connection()?;
        match device_dao::get_device_by_id(&mut conn, device_id)? {
            Some(row) => Ok(Some(Device::try_from(row)?)),
            None => Ok(None),
        }
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
