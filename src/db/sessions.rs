use crate::db::db::Db;
use crate::libs::error::{Result, TimekeeperError};
use crate::libs::session::{format_timestamp, Session, SessionQuery, SessionRow, SessionStore, SessionUpdate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const SESSION_COLUMNS: &str = "id, user_id, location_id, location_name, entry_at, exit_at, pause_minutes, manually_edited, entry_method, edit_reason, deleted_at";
const INSERT_SESSION: &str = "INSERT INTO sessions (id, user_id, location_id, location_name, entry_at, exit_at, pause_minutes, manually_edited, entry_method, edit_reason, deleted_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
const UPDATE_SESSION: &str = "UPDATE sessions SET
    exit_at = COALESCE(?2, exit_at),
    pause_minutes = COALESCE(?3, pause_minutes),
    manually_edited = COALESCE(?4, manually_edited),
    edit_reason = COALESCE(?5, edit_reason),
    deleted_at = COALESCE(?6, deleted_at),
    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
    WHERE id = ?1";

/// SQLite-backed [`SessionStore`].
pub struct Sessions {
    conn: Connection,
}

impl Sessions {
    pub fn new() -> Result<Self> {
        Ok(Self::with_db(Db::new()?))
    }

    pub fn with_db(db: Db) -> Self {
        Self { conn: db.conn }
    }
}

/// Reads a row into the untyped shape; typing happens in `Session::try_from`.
fn to_row(row: &Row) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        location_id: row.get(2)?,
        location_name: row.get(3)?,
        entry_at: row.get(4)?,
        exit_at: row.get(5)?,
        pause_minutes: row.get(6)?,
        manually_edited: row.get(7)?,
        entry_method: row.get(8)?,
        edit_reason: row.get(9)?,
        deleted_at: row.get(10)?,
    })
}

impl SessionStore for Sessions {
    fn query(&mut self, query: &SessionQuery) -> Result<Vec<Session>> {
        let sql = format!(
            "SELECT {} FROM sessions
            WHERE user_id = ?1
              AND (?2 IS NULL OR entry_at >= ?2)
              AND (?3 IS NULL OR entry_at <= ?3)
              AND (?4 OR deleted_at IS NULL)
            ORDER BY entry_at ASC",
            SESSION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![query.owner_id, query.from.map(format_timestamp), query.to.map(format_timestamp), query.include_deleted],
                to_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(owner_id = %query.owner_id, count = rows.len(), "Queried sessions");
        rows.into_iter().map(Session::try_from).collect()
    }

    fn get(&mut self, id: &str) -> Result<Option<Session>> {
        let sql = format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS);
        let row = self.conn.query_row(&sql, params![id], to_row).optional()?;
        row.map(Session::try_from).transpose()
    }

    fn insert(&mut self, session: &Session) -> Result<()> {
        let row = SessionRow::from(session);
        self.conn.execute(
            INSERT_SESSION,
            params![
                row.id,
                row.user_id,
                row.location_id,
                row.location_name,
                row.entry_at,
                row.exit_at,
                row.pause_minutes,
                row.manually_edited,
                row.entry_method,
                row.edit_reason,
                row.deleted_at
            ],
        )?;
        Ok(())
    }

    fn update(&mut self, id: &str, update: &SessionUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let affected = self.conn.execute(
            UPDATE_SESSION,
            params![
                id,
                update.exit_at.map(format_timestamp),
                update.pause_minutes,
                update.manually_edited,
                update.edit_reason,
                update.deleted_at.map(format_timestamp)
            ],
        )?;
        if affected == 0 {
            return Err(TimekeeperError::not_found(format!("Entry {}", id)));
        }
        Ok(())
    }
}
