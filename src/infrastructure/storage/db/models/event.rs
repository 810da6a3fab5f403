use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::event::ClipboardEvent;
use crate::utils::helpers::to_storage_timestamp;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::infrastructure::storage::db::schema::events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbEvent {
    pub event_id: String,
    pub source_device_id: String,
    /// RFC-3339 UTC text, second precision.
    pub timestamp: String,
    pub content_type: String,
    pub text: String,
    pub text_hash: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::infrastructure::storage::db::schema::events)]
pub struct NewEvent<'a> {
    pub event_id: &'a str,
    pub source_device_id: &'a str,
    pub timestamp: String,
    pub content_type: &'a str,
    pub text: &'a str,
    pub text_hash: &'a str,
}

impl<'a> From<&'a ClipboardEvent> for NewEvent<'a> {
    fn from(event: &'a ClipboardEvent) -> Self {
        NewEvent {
            event_id: &event.event_id,
            source_device_id: &event.source_device_id,
            timestamp: to_storage_timestamp(&event.timestamp),
            content_type: &event.content_type,
            text: &event.text,
            text_hash: &event.text_hash,
        }
    }
}

impl TryFrom<DbEvent> for ClipboardEvent {
    type Error = anyhow::Error;

    fn try_from(row: DbEvent) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .with_context(|| format!("invalid stored timestamp: {}", row.timestamp))?
            .with_timezone(&Utc);
        Ok(ClipboardEvent {
            event_id: row.event_id,
            source_device_id: row.source_device_id,
            timestamp,
            content_type: row.content_type,
            text: row.text,
            text_hash: row.text_hash,
        })
    }
}
