use crate::db::db::Db;
use crate::libs::error::{Result, TimekeeperError};
use crate::libs::grant::{AccessGrant, GrantStatus, GrantStore, GrantUpdate, PendingToken};
use crate::libs::session::{format_timestamp, parse_timestamp};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use tracing::debug;

const GRANT_COLUMNS: &str = "id, owner_id, viewer_id, token, status, label, created_at, accepted_at, revoked_at";
const TOKEN_COLUMNS: &str = "id, token, owner_id, owner_name, created_at, expires_at";
const INSERT_TOKEN: &str = "INSERT INTO pending_tokens (id, token, owner_id, owner_name, created_at, expires_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const DELETE_TOKEN: &str = "DELETE FROM pending_tokens WHERE id = ?1 AND token = ?2";
const INSERT_GRANT: &str = "INSERT INTO access_grants (id, owner_id, viewer_id, token, status, label, created_at, accepted_at, revoked_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";
const UPDATE_GRANT: &str = "UPDATE access_grants SET status = ?2, accepted_at = ?3, revoked_at = ?4 WHERE id = ?1";

pub const DUPLICATE_GRANT_MESSAGE: &str = "You already have access to this worker";

/// SQLite-backed [`GrantStore`].
pub struct Grants {
    conn: Connection,
}

impl Grants {
    pub fn new() -> Result<Self> {
        Ok(Self::with_db(Db::new()?))
    }

    pub fn with_db(db: Db) -> Self {
        Self { conn: db.conn }
    }

    fn grants_where(&self, condition: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<AccessGrant>> {
        let sql = format!("SELECT {} FROM access_grants WHERE {} ORDER BY created_at DESC", GRANT_COLUMNS, condition);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, to_grant_row)?.collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(AccessGrant::try_from).collect()
    }
}

struct GrantRow {
    id: String,
    owner_id: String,
    viewer_id: String,
    token: String,
    status: String,
    label: Option<String>,
    created_at: String,
    accepted_at: Option<String>,
    revoked_at: Option<String>,
}

fn to_grant_row(row: &Row) -> rusqlite::Result<GrantRow> {
    Ok(GrantRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        viewer_id: row.get(2)?,
        token: row.get(3)?,
        status: row.get(4)?,
        label: row.get(5)?,
        created_at: row.get(6)?,
        accepted_at: row.get(7)?,
        revoked_at: row.get(8)?,
    })
}

impl TryFrom<GrantRow> for AccessGrant {
    type Error = TimekeeperError;

    fn try_from(row: GrantRow) -> Result<Self> {
        Ok(AccessGrant {
            id: row.id,
            owner_id: row.owner_id,
            viewer_id: row.viewer_id,
            token: row.token,
            status: row.status.parse::<GrantStatus>()?,
            label: row.label,
            created_at: parse_timestamp(&row.created_at)?,
            accepted_at: row.accepted_at.as_deref().map(parse_timestamp).transpose()?,
            revoked_at: row.revoked_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

fn to_token(row: &Row) -> rusqlite::Result<(String, String, String, Option<String>, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl GrantStore for Grants {
    fn insert_token(&mut self, token: &PendingToken) -> Result<()> {
        self.conn.execute(
            INSERT_TOKEN,
            params![
                token.id,
                token.token,
                token.owner_id,
                token.owner_name,
                format_timestamp(token.created_at),
                format_timestamp(token.expires_at)
            ],
        )?;
        Ok(())
    }

    fn find_token(&mut self, token: &str) -> Result<Option<PendingToken>> {
        let sql = format!("SELECT {} FROM pending_tokens WHERE token = ?1", TOKEN_COLUMNS);
        let row = self.conn.query_row(&sql, params![token], to_token).optional()?;

        row.map(|(id, token, owner_id, owner_name, created_at, expires_at)| {
            Ok(PendingToken {
                id,
                token,
                owner_id,
                owner_name: owner_name.unwrap_or_default(),
                created_at: parse_timestamp(&created_at)?,
                expires_at: parse_timestamp(&expires_at)?,
            })
        })
        .transpose()
    }

    fn redeem(&mut self, token: &PendingToken, grant: &AccessGrant) -> Result<()> {
        let tx = self.conn.transaction()?;

        // Compare-and-delete: only one redemption can remove the row.
        let consumed = tx.execute(DELETE_TOKEN, params![token.id, token.token])?;
        if consumed == 0 {
            debug!(token_id = %token.id, "Token already consumed");
            return Err(TimekeeperError::not_found("Token invalid or expired"));
        }

        let inserted = tx.execute(
            INSERT_GRANT,
            params![
                grant.id,
                grant.owner_id,
                grant.viewer_id,
                grant.token,
                grant.status.as_str(),
                grant.label,
                format_timestamp(grant.created_at),
                grant.accepted_at.map(format_timestamp),
                grant.revoked_at.map(format_timestamp)
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(TimekeeperError::Conflict(DUPLICATE_GRANT_MESSAGE.to_string())),
            Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(())
    }

    fn get_grant(&mut self, id: &str) -> Result<Option<AccessGrant>> {
        let sql = format!("SELECT {} FROM access_grants WHERE id = ?1", GRANT_COLUMNS);
        let row = self.conn.query_row(&sql, params![id], to_grant_row).optional()?;
        row.map(AccessGrant::try_from).transpose()
    }

    fn find_grant(&mut self, owner_id: &str, viewer_id: &str, status: Option<GrantStatus>) -> Result<Option<AccessGrant>> {
        let status = status.map(|s| s.as_str());
        let grants = self.grants_where("owner_id = ?1 AND viewer_id = ?2 AND (?3 IS NULL OR status = ?3)", &[&owner_id, &viewer_id, &status])?;
        Ok(grants.into_iter().next())
    }

    fn update_grant(&mut self, id: &str, update: &GrantUpdate) -> Result<()> {
        let affected = self.conn.execute(
            UPDATE_GRANT,
            params![
                id,
                update.status.as_str(),
                update.accepted_at.map(format_timestamp),
                update.revoked_at.map(format_timestamp)
            ],
        )?;
        if affected == 0 {
            return Err(TimekeeperError::not_found(format!("Grant {}", id)));
        }
        Ok(())
    }

    fn grants_for_owner(&mut self, owner_id: &str) -> Result<Vec<AccessGrant>> {
        self.grants_where("owner_id = ?1", &[&owner_id])
    }

    fn grants_for_viewer(&mut self, viewer_id: &str, status: Option<GrantStatus>) -> Result<Vec<AccessGrant>> {
        let status = status.map(|s| s.as_str());
        self.grants_where("viewer_id = ?1 AND (?2 IS NULL OR status = ?2)", &[&viewer_id, &status])
    }
}
