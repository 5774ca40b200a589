use crate::db::db::Db;
use crate::libs::archive::{DismissalCache, DEFAULT_EXPIRY_DAYS};
use crate::libs::error::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use tracing::debug;

const UPSERT_DISMISSAL: &str = "INSERT OR REPLACE INTO dismissed_entries (entry_id, worker_id, archived_at) VALUES (?1, ?2, ?3)";
const SELECT_DISMISSED_IDS: &str = "SELECT entry_id FROM dismissed_entries WHERE worker_id = ?1";
const DELETE_EXPIRED: &str = "DELETE FROM dismissed_entries WHERE archived_at < ?1";

/// SQLite-backed [`DismissalCache`]; `archived_at` is stored as epoch millis.
pub struct Dismissals {
    conn: Connection,
    expiry: Duration,
}

impl Dismissals {
    pub fn new() -> Result<Self> {
        Ok(Self::with_db(Db::new()?))
    }

    pub fn with_db(db: Db) -> Self {
        Self {
            conn: db.conn,
            expiry: Duration::days(DEFAULT_EXPIRY_DAYS),
        }
    }

    pub fn with_expiry_days(mut self, days: i64) -> Self {
        self.expiry = Duration::try_days(days.max(1)).unwrap_or(Duration::MAX);
        self
    }
}

impl DismissalCache for Dismissals {
    fn dismissed_ids(&mut self, worker_id: &str) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare(SELECT_DISMISSED_IDS)?;
        let ids = stmt
            .query_map(params![worker_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn mark_dismissed(&mut self, entry_ids: &[String], worker_id: &str, at: DateTime<Utc>) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for entry_id in entry_ids {
            tx.execute(UPSERT_DISMISSAL, params![entry_id, worker_id, at.timestamp_millis()])?;
        }
        tx.commit()?;
        Ok(entry_ids.len())
    }

    fn sweep_expired(&mut self, now: DateTime<Utc>) -> Result<usize> {
        // An expiry reaching past the representable range keeps every marker.
        let cutoff = now.checked_sub_signed(self.expiry).map_or(i64::MIN, |c| c.timestamp_millis());
        let removed = self.conn.execute(DELETE_EXPIRED, params![cutoff])?;
        debug!(removed, "Swept expired dismissals");
        Ok(removed)
    }
}
