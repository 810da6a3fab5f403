use anyhow::{anyhow, Context, Result};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use once_cell::sync::Lazy;
use std::sync::RwLock;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Process-wide connection pool. Initialized once at startup with the
/// configured database path; request handlers borrow short-lived
/// connections from it.
pub static DB_POOL: Lazy<DbPool> = Lazy::new(DbPool::new);

/// Timestamps are RFC-3339 UTC text so lexicographic index order equals
/// chronological order.
const BOOTSTRAP_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    event_id         TEXT PRIMARY KEY NOT NULL,
    source_device_id TEXT NOT NULL,
    timestamp        TEXT NOT NULL,
    content_type     TEXT NOT NULL DEFAULT 'text',
    text             TEXT NOT NULL,
    text_hash        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
CREATE INDEX IF NOT EXISTS idx_events_source ON events(source_device_id);
CREATE INDEX IF NOT EXISTS idx_events_hash ON events(text_hash);

CREATE TABLE IF NOT EXISTS devices (
    device_id       TEXT PRIMARY KEY NOT NULL,
    device_name     TEXT NOT NULL,
    network_address TEXT,
    last_seen_utc   TEXT NOT NULL,
    enabled         BOOLEAN NOT NULL DEFAULT 1
);
"#;

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        // WAL keeps readers unblocked while a writer is active;
        // busy_timeout serializes the writers instead of failing them.
        conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create the schema on a raw connection. Used by pool init and by tests
/// that run against in-memory connections.
pub fn initialize_schema(conn: &mut SqliteConnection) -> Result<()> {
    conn.batch_execute(BOOTSTRAP_SCHEMA)
        .context("failed to create database schema")
}

pub struct DbPool {
    inner: RwLock<Option<SqlitePool>>,
}

impl DbPool {
    fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Open (or reopen) the pool against the given SQLite path and create
    /// the schema eagerly so handlers never race table creation.
    pub fn init(&self, database_url: &str) -> Result<()> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(8)
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)
            .with_context(|| format!("failed to open database at {}", database_url))?;

        {
            let mut conn = pool
                .get()
                .with_context(|| format!("failed to connect to database at {}", database_url))?;
            initialize_schema(&mut conn)?;
        }

        *self.inner.write().unwrap() = Some(pool);
        Ok(())
    }

    pub fn get_connection(&self) -> Result<SqlitePooledConnection> {
        let guard = self.inner.read().unwrap();
        let pool = guard
            .as_ref()
            .ok_or_else(|| anyhow!("database pool is not initialized"))?;
        pool.get().context("failed to get a database connection")
    }

    /// Drop the pool, closing every connection and letting SQLite
    /// checkpoint the WAL.
    pub fn close(&self) {
        *self.inner.write().unwrap() = None;
    }
}
