use anyhow::Result;
use chrono::{Duration, Utc};
use log::{debug, info};

use crate::domain::event::ClipboardEvent;
use crate::infrastructure::storage::db::dao::event as event_dao;
use crate::infrastructure::storage::db::models::event::NewEvent;
use crate::infrastructure::storage::db::pool::DB_POOL;
use crate::utils::helpers::to_storage_timestamp;

/// Durable event log with bounded history.
///
/// Inserts are idempotent on `event_id` so agent retries across transient
/// failures are absorbed silently. The count cap is enforced amortized
/// after each insert that actually wrote a row; the age cap runs on a
/// low-frequency sweep owned by the hub binary.
pub struct EventLogManager {
    history_limit: u32,
    retention_days: u32,
}

impl EventLogManager {
    pub fn new(history_limit: u32, retention_days: u32) -> Self {
        Self {
            history_limit,
            retention_days,
        }
    }

    /// Normalize missing fields: a zero timestamp becomes now, an empty
    /// hash is recomputed from the text, an empty content type defaults to
    /// "text". Unknown content types are stored untouched.
    fn normalize(&self, event: &mut ClipboardEvent) {
        if event.timestamp.timestamp() <= 0 {
            event.timestamp = Utc::now();
        }
        if event.text_hash.is_empty() {
            event.set_text_hash();
        }
        if event.content_type.is_empty() {
            event.content_type = "text".to_string();
        }
    }

    /// Normalize and persist. Returns the normalized event along with
    /// whether a new row was written; a duplicate `event_id` yields
    /// `false` and must not be re-broadcast.
    pub fn insert(&self, mut event: ClipboardEvent) -> Result<(ClipboardEvent, bool)> {
        self.normalize(&mut event);

        let mut conn = DB_POOL.get_connection()?;
        let inserted = event_dao::insert_event(&mut conn, &NewEvent::from(&event))?;

        if inserted {
            if self.history_limit > 0 {
                let removed = event_dao::prune_to_limit(&mut conn, self.history_limit as i64)?;
                if removed > 0 {
                    debug!("pruned {} events beyond history limit", removed);
                }
            }
        } else {
            debug!("duplicate event {} ignored", event.event_id);
        }

        Ok((event, inserted))
    }

    /// The newest `limit` events, newest first.
    pub fn recent(&self, limit: i64) -> Result<Vec<ClipboardEvent>> {
        let mut conn = DB_POOL.get_connection()?;
        let rows = event_dao::recent_events(&mut conn, limit)?;
        rows.into_iter().map(ClipboardEvent::try_from).collect()
    }

    /// Drop events past the retention age. No-op when retention is 0.
    pub fn prune_by_age(&self) -> Result<usize> {
        if self.retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(self.retention_days as i64);
        let cutoff = to_storage_timestamp(&cutoff);

        let mut conn = DB_POOL.get_connection()?;
        let removed = event_dao::prune_older_than(&mut conn, &cutoff)?;
        if removed > 0 {
            info!("retention sweep removed {} events", removed);
        }
        Ok(removed)
    }
}
