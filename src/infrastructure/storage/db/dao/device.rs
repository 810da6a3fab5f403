use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::infrastructure::storage::db::models::device::{DbDevice, NewDevice};
use crate::infrastructure::storage::db::schema::devices;

/// Insert-or-replace on `device_id`. Re-registration is the device's
/// heartbeat, so every field including `last_seen_utc` is refreshed.
pub fn upsert_device(conn: &mut SqliteConnection, device: &NewDevice) -> Result<()> {
    diesel::insert_into(devices::table)
        .values(device)
        .on_conflict(devices::device_id)
        .do_update()
        .set((
            devices::device_name.eq(device.device_name),
            devices::network_address.eq(device.network_address),
            devices::last_seen_utc.eq(device.last_seen_utc.clone()),
            devices::enabled.eq(device.enabled),
        ))
        .execute(conn)
        .context("failed to upsert device")?;
    Ok(())
}

/// Refresh `last_seen_utc` for a known device. Returns the number of rows
/// touched; zero means the device never registered, which is not an error.
pub fn touch_device(conn: &mut SqliteConnection, device_id: &str, now: &str) -> Result<usize> {
    diesel::update(devices::table.find(device_id))
        .set(devices::last_seen_utc.eq(now))
        .execute(conn)
        .context("failed to touch device")
}

pub fn get_device_by_id(conn: &mut SqliteConnection, device_id: &str) -> Result<Option<DbDevice>> {
    devices::table
        .find(device_id)
        .first::<DbDevice>(conn)
        .optional()
        .context("failed to get device by id")
}

pub fn get_all_devices(conn: &mut SqliteConnection) -> Result<Vec<DbDevice>> {
    devices::table
        .order(devices::device_id.asc())
        .load::<DbDevice>(conn)
        .context("failed to list devices")
}
