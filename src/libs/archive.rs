//! Local record of entries a viewer has already handled ("dismissed").
//!
//! Dismissal is a per-device convenience: it only hides sessions from the
//! pending-hours view and never touches the owner's records. Markers expire
//! after a fixed number of days and are swept on a best-effort basis.

use crate::libs::error::Result;
use crate::libs::session::Session;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub const DEFAULT_EXPIRY_DAYS: i64 = 60;

/// Storage contract for dismissal markers.
pub trait DismissalCache {
    /// Ids of entries dismissed for `worker_id`.
    fn dismissed_ids(&mut self, worker_id: &str) -> Result<HashSet<String>>;

    /// Marks `entry_ids` dismissed at `at`. Re-dismissing refreshes the marker.
    fn mark_dismissed(&mut self, entry_ids: &[String], worker_id: &str, at: DateTime<Utc>) -> Result<usize>;

    /// Removes markers older than the cache's expiry. Returns how many were removed.
    fn sweep_expired(&mut self, now: DateTime<Utc>) -> Result<usize>;
}

/// Keeps the sessions whose ids are not in `dismissed`, preserving order.
pub fn without_dismissed(sessions: Vec<Session>, dismissed: &HashSet<String>) -> Vec<Session> {
    if dismissed.is_empty() {
        return sessions;
    }
    sessions.into_iter().filter(|s| !dismissed.contains(&s.id)).collect()
}
