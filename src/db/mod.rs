//! SQLite persistence for the timekeeper.
//!
//! Each store implements one of the storage traits from [`crate::libs`] and
//! owns its own connection, opened through [`db::Db`] so migrations have
//! run before the first query.
//!
//! ## Usage
//!
//! ```rust
//! use onsite_timekeeper::db::{db::Db, sessions::Sessions};
//! use onsite_timekeeper::libs::session::{Session, SessionQuery, SessionStore};
//! use chrono::Utc;
//!
//! let mut sessions = Sessions::with_db(Db::in_memory()?);
//! sessions.insert(&Session::open("worker-1", Utc::now()))?;
//! assert_eq!(sessions.query(&SessionQuery::owner("worker-1"))?.len(), 1);
//! # Ok::<(), onsite_timekeeper::libs::error::TimekeeperError>(())
//! ```

/// Connection management.
pub mod db;

/// Versioned schema changes.
pub mod migrations;

/// Dismissal markers of the pending-hours view.
pub mod dismissals;

/// Access grants and pending link tokens.
pub mod grants;

/// Geofenced job sites.
pub mod locations;

/// Entry/exit time records.
pub mod sessions;
