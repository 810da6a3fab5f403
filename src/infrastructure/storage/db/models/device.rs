use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::device::Device;
use crate::utils::helpers::to_storage_timestamp;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::infrastructure::storage::db::schema::devices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbDevice {
    pub device_id: String,
    pub device_name: String,
    pub network_address: Option<String>,
    pub last_seen_utc: String,
    pub enabled: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::infrastructure::storage::db::schema::devices)]
pub struct NewDevice<'a> {
    pub device_id: &'a str,
    pub device_name: &'a str,
    pub network_address: Option<&'a str>,
    pub last_seen_utc: String,
    pub enabled: bool,
}

impl<'a> From<&'a Device> for NewDevice<'a> {
    fn from(device: &'a Device) -> Self {
        NewDevice {
            device_id: &device.device_id,
            device_name: &device.device_name,
            network_address: device.network_address.as_deref(),
            last_seen_utc: to_storage_timestamp(&device.last_seen_utc),
            enabled: device.enabled,
        }
    }
}

impl TryFrom<DbDevice> for Device {
    type Error = anyhow::Error;

    fn try_from(row: DbDevice) -> Result<Self> {
        let last_seen_utc = DateTime::parse_from_rfc3339(&row.last_seen_utc)
            .with_context(|| format!("invalid stored last_seen_utc: {}", row.last_seen_utc))?
            .with_timezone(&Utc);
        Ok(Device {
            device_id: row.device_id,
            device_name: row.device_name,
            network_address: row.network_address,
            last_seen_utc,
            enabled: row.enabled,
        })
    }
}
