use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;

/// Durable set of senders the bot has already seen. Backed by SQLite so the
/// set survives restarts; every write goes straight to disk.
#[derive(Clone)]
pub struct VisitorRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl VisitorRegistry {
    /// Open or create the registry database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open visitor database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Visitor registry initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory registry (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS visitors (
                sender_id INTEGER PRIMARY KEY,
                first_seen TEXT NOT NULL
            );",
        )
        .context("Failed to migrate visitor database")?;
        Ok(())
    }

    /// Whether this sender has interacted with the bot before.
    pub async fn is_known(&self, sender_id: u64) -> Result<bool> {
        let conn = self.conn.lock().await;
        let known: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM visitors WHERE sender_id = ?1)",
                rusqlite::params![sender_id as i64],
                |row| row.get(0),
            )
            .context("Failed to query visitor registry")?;
        Ok(known)
    }

    /// Record a first-time sender. Recording an already-known id is a no-op,
    /// so same-id races leave exactly one row.
    pub async fn record(&self, sender_id: u64, first_seen: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO visitors (sender_id, first_seen) VALUES (?1, ?2)",
            rusqlite::params![sender_id as i64, first_seen.to_rfc3339()],
        )
        .context("Failed to record visitor")?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn count(&self) -> i64 {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT count(*) FROM visitors", [], |row| row.get(0))
            .unwrap()
    }

    /// Drops the backing table so the next call fails, simulating an
    /// unreachable durable store.
    #[cfg(test)]
    pub(crate) async fn drop_backing_table(&self) {
        let conn = self.conn.lock().await;
        conn.execute_batch("DROP TABLE visitors").unwrap();
    }
}
