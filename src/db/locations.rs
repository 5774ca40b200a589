use crate::db::db::Db;
use crate::libs::error::{Result, TimekeeperError};
use crate::libs::location::{Location, LocationStatus, LocationStore};
use crate::libs::session::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

const LOCATION_COLUMNS: &str = "id, user_id, name, latitude, longitude, radius, color, status, deleted_at, created_at, updated_at";
const INSERT_LOCATION: &str = "INSERT INTO locations (id, user_id, name, latitude, longitude, radius, color, status, deleted_at, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
const RENAME_LOCATION: &str = "UPDATE locations SET name = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'active'";
const SOFT_DELETE_LOCATION: &str = "UPDATE locations SET status = 'deleted', deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND status = 'active'";

/// SQLite-backed [`LocationStore`].
pub struct Locations {
    conn: Connection,
}

impl Locations {
    pub fn new() -> Result<Self> {
        Ok(Self::with_db(Db::new()?))
    }

    pub fn with_db(db: Db) -> Self {
        Self { conn: db.conn }
    }
}

struct LocationRow {
    id: String,
    owner_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    radius: f64,
    color: String,
    status: String,
    deleted_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn to_row(row: &Row) -> rusqlite::Result<LocationRow> {
    Ok(LocationRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        radius: row.get(5)?,
        color: row.get(6)?,
        status: row.get(7)?,
        deleted_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<LocationRow> for Location {
    type Error = TimekeeperError;

    fn try_from(row: LocationRow) -> Result<Self> {
        Ok(Location {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            radius: row.radius,
            color: row.color,
            status: row.status.parse::<LocationStatus>()?,
            deleted_at: row.deleted_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl LocationStore for Locations {
    fn insert(&mut self, location: &Location) -> Result<()> {
        self.conn.execute(
            INSERT_LOCATION,
            params![
                location.id,
                location.owner_id,
                location.name,
                location.latitude,
                location.longitude,
                location.radius,
                location.color,
                location.status.as_str(),
                location.deleted_at.map(format_timestamp),
                format_timestamp(location.created_at),
                format_timestamp(location.updated_at)
            ],
        )?;
        Ok(())
    }

    fn get(&mut self, id: &str) -> Result<Option<Location>> {
        let sql = format!("SELECT {} FROM locations WHERE id = ?1", LOCATION_COLUMNS);
        let row = self.conn.query_row(&sql, params![id], to_row).optional()?;
        row.map(Location::try_from).transpose()
    }

    fn list_active(&mut self, owner_id: &str) -> Result<Vec<Location>> {
        let sql = format!("SELECT {} FROM locations WHERE user_id = ?1 AND status = 'active' ORDER BY name", LOCATION_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], to_row)?.collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(Location::try_from).collect()
    }

    fn rename(&mut self, id: &str, name: &str, at: DateTime<Utc>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TimekeeperError::validation("Location name is required"));
        }
        let affected = self.conn.execute(RENAME_LOCATION, params![id, name, format_timestamp(at)])?;
        if affected == 0 {
            return Err(TimekeeperError::not_found("Location not found"));
        }
        Ok(())
    }

    fn soft_delete(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let affected = self.conn.execute(SOFT_DELETE_LOCATION, params![id, format_timestamp(at)])?;
        if affected == 0 {
            return Err(TimekeeperError::not_found("Location not found"));
        }
        Ok(())
    }
}
