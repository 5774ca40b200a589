//! Versioned schema migrations.
//!
//! Every migration runs inside one transaction together with the record of
//! its application, so a failed upgrade leaves the schema where it was.
//!
//! ## Usage
//!
//! ```rust
//! use onsite_timekeeper::db::migrations::{get_db_version, init_with_migrations};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open_in_memory()?;
//! init_with_migrations(&mut conn)?;
//! assert_eq!(get_db_version(&conn)?, 3);
//! # Ok::<(), onsite_timekeeper::libs::error::TimekeeperError>(())
//! ```

use crate::libs::error::Result;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error};
use rusqlite::{params, Connection, Transaction};

const MIGRATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Debug, Clone)]
struct Migration {
    version: u32,
    name: &'static str,
    up: fn(&Transaction) -> Result<()>,
}

pub struct MigrationManager {
    migrations: Vec<Migration>,
}

impl MigrationManager {
    pub fn new() -> Self {
        let mut manager = Self { migrations: Vec::new() };
        manager.register_migrations();
        manager
    }

    fn register_migrations(&mut self) {
        self.add_migration(1, "create_sessions_and_locations", |tx| {
            tx.execute(
                "CREATE TABLE IF NOT EXISTS locations (
        id TEXT NOT NULL PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        radius REAL NOT NULL,
        color TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        deleted_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
                [],
            )?;

            // Nullable columns mirror rows written by older clients.
            tx.execute(
                "CREATE TABLE IF NOT EXISTS sessions (
        id TEXT NOT NULL PRIMARY KEY,
        user_id TEXT NOT NULL,
        location_id TEXT,
        location_name TEXT,
        entry_at TEXT NOT NULL,
        exit_at TEXT,
        pause_minutes INTEGER,
        manually_edited BOOLEAN,
        entry_method TEXT,
        edit_reason TEXT,
        deleted_at TEXT,
        updated_at TEXT
    )",
                [],
            )?;

            tx.execute("CREATE INDEX IF NOT EXISTS idx_sessions_user_entry ON sessions(user_id, entry_at)", [])?;
            tx.execute("CREATE INDEX IF NOT EXISTS idx_locations_user ON locations(user_id, status)", [])?;
            Ok(())
        });

        self.add_migration(2, "create_access_grants_and_tokens", |tx| {
            tx.execute(
                "CREATE TABLE IF NOT EXISTS access_grants (
        id TEXT NOT NULL PRIMARY KEY,
        owner_id TEXT NOT NULL,
        viewer_id TEXT NOT NULL,
        token TEXT NOT NULL,
        status TEXT NOT NULL,
        label TEXT,
        created_at TEXT NOT NULL,
        accepted_at TEXT,
        revoked_at TEXT
    )",
                [],
            )?;

            // One live grant per pair; revoked rows do not block re-linking.
            tx.execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_access_grants_pair ON access_grants(owner_id, viewer_id) WHERE status != 'revoked'",
                [],
            )?;
            tx.execute("CREATE INDEX IF NOT EXISTS idx_access_grants_viewer ON access_grants(viewer_id, status)", [])?;

            tx.execute(
                "CREATE TABLE IF NOT EXISTS pending_tokens (
        id TEXT NOT NULL PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        owner_id TEXT NOT NULL,
        owner_name TEXT,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )",
                [],
            )?;
            Ok(())
        });

        self.add_migration(3, "create_dismissed_entries", |tx| {
            tx.execute(
                "CREATE TABLE IF NOT EXISTS dismissed_entries (
        entry_id TEXT NOT NULL PRIMARY KEY,
        worker_id TEXT NOT NULL,
        archived_at INTEGER NOT NULL
    )",
                [],
            )?;
            tx.execute("CREATE INDEX IF NOT EXISTS idx_dismissed_entries_worker ON dismissed_entries(worker_id)", [])?;
            Ok(())
        });
    }

    fn add_migration(&mut self, version: u32, name: &'static str, up: fn(&Transaction) -> Result<()>) {
        self.migrations.push(Migration { version, name, up });
    }

    pub fn run_migrations(&self, conn: &mut Connection) -> Result<()> {
        conn.execute(MIGRATIONS_TABLE, [])?;

        let current_version = self.get_current_version(conn)?;
        let pending: Vec<&Migration> = self.migrations.iter().filter(|m| m.version > current_version).collect();

        if pending.is_empty() {
            msg_debug!(Message::DatabaseUpToDate);
            return Ok(());
        }

        msg_debug!(Message::MigrationsFound(pending.len()));

        let tx = conn.transaction()?;
        for migration in pending {
            msg_debug!(Message::RunningMigration(migration.version, migration.name.to_string()));

            match (migration.up)(&tx) {
                Ok(()) => {
                    tx.execute(
                        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
                        params![migration.version, migration.name],
                    )?;
                    msg_debug!(Message::MigrationCompleted(migration.version));
                }
                Err(e) => {
                    msg_error!(Message::MigrationFailed(migration.version, e.to_string()));
                    return Err(e);
                }
            }
        }
        tx.commit()?;

        msg_debug!(Message::AllMigrationsCompleted);
        Ok(())
    }

    fn get_current_version(&self, conn: &Connection) -> Result<u32> {
        let version: Option<u32> = conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?;
        Ok(version.unwrap_or(0))
    }

    /// `(version, name, applied_at)` of every applied migration.
    pub fn get_migration_history(&self, conn: &Connection) -> Result<Vec<(u32, String, String)>> {
        let mut stmt = conn.prepare("SELECT version, name, applied_at FROM migrations ORDER BY version")?;

        let history = stmt
            .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(history)
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_with_migrations(conn: &mut Connection) -> Result<()> {
    MigrationManager::new().run_migrations(conn)
}

pub fn get_db_version(conn: &Connection) -> Result<u32> {
    MigrationManager::new().get_current_version(conn)
}
