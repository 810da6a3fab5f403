use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::infrastructure::storage::db::models::event::{DbEvent, NewEvent};
use crate::infrastructure::storage::db::schema::events;

/// Insert an event, ignoring duplicates on `event_id`.
///
/// Returns true when a row was actually written. Duplicate inserts are a
/// normal outcome of agent retries, not an error.
pub fn insert_event(conn: &mut SqliteConnection, event: &NewEvent) -> Result<bool> {
    let inserted = diesel::insert_into(events::table)
        .values(event)
        .on_conflict(events::event_id)
        .do_nothing()
        .execute(conn)
        .context("failed to insert event")?;
    Ok(inserted > 0)
}

/// The newest `limit` events, newest first.
pub fn recent_events(conn: &mut SqliteConnection, limit: i64) -> Result<Vec<DbEvent>> {
    events::table
        .order((events::timestamp.desc(), events::event_id.desc()))
        .limit(limit)
        .load::<DbEvent>(conn)
        .context("failed to query recent events")
}

pub fn count_events(conn: &mut SqliteConnection) -> Result<i64> {
    events::table
        .count()
        .get_result(conn)
        .context("failed to count events")
}

/// Delete everything beyond the newest `limit` events. Returns the number
/// of rows removed.
pub fn prune_to_limit(conn: &mut SqliteConnection, limit: i64) -> Result<usize> {
    diesel::sql_query(
        "DELETE FROM events WHERE event_id NOT IN \
         (SELECT event_id FROM events ORDER BY timestamp DESC, event_id DESC LIMIT ?)",
    )
    .bind::<diesel::sql_types::BigInt, _>(limit)
    .execute(conn)
    .context("failed to prune events to history limit")
}

/// Delete events with a stored timestamp before `cutoff` (RFC-3339 UTC
/// text; lexicographic comparison matches chronological order).
pub fn prune_older_than(conn: &mut SqliteConnection, cutoff: &str) -> Result<usize> {
    diesel::delete(events::table.filter(events::timestamp.lt(cutoff)))
        .execute(conn)
        .context("failed to prune events by age")
}
