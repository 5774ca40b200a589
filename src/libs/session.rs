//! Time records ("sessions") and the boundary that turns untyped store rows
//! into them.
//!
//! A [`Session`] is one entry/exit pair for one worker at one job site. Its
//! status and duration are always derived from `exit_at` and the current
//! instant, never stored. Rows coming from a store (or an imported JSON dump)
//! pass through [`SessionRow`] first, which holds every field as optional and
//! is converted with a single exhaustive mapping that applies defaults and
//! rejects rows missing `id`, owner or `entry_at`.
//!
//! ## Usage
//!
//! ```rust
//! use onsite_timekeeper::libs::session::{Session, SessionRow};
//!
//! let row: SessionRow = serde_json::from_str(r#"{
//!     "id": "rec-1",
//!     "user_id": "worker-1",
//!     "entry_at": "2024-01-01T08:00:00.000Z",
//!     "exit_at": null,
//!     "geofence_name": "Main St Site"
//! }"#)?;
//! let session = Session::try_from(row)?;
//! assert_eq!(session.pause_minutes, 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::libs::duration::{calculate_duration, net_minutes};
use crate::libs::error::{Result, TimekeeperError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serializes an instant the way every store in this crate writes it.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an ISO-8601 / RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimekeeperError::validation(format!("Invalid timestamp: {}", value)))
}

/// Derived session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Finished,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Finished => write!(f, "finished"),
        }
    }
}

/// How a session was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMethod {
    #[default]
    Automatic,
    Manual,
    QrCode,
    Nfc,
}

impl EntryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMethod::Automatic => "automatic",
            EntryMethod::Manual => "manual",
            EntryMethod::QrCode => "qr_code",
            EntryMethod::Nfc => "nfc",
        }
    }
}

impl FromStr for EntryMethod {
    type Err = TimekeeperError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "automatic" => Ok(EntryMethod::Automatic),
            "manual" => Ok(EntryMethod::Manual),
            "qr_code" => Ok(EntryMethod::QrCode),
            "nfc" => Ok(EntryMethod::Nfc),
            other => Err(TimekeeperError::validation(format!("Unknown entry method: {}", other))),
        }
    }
}

/// A single entry/exit time record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub id: String,
    pub owner_id: String,
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub entry_at: DateTime<Utc>,
    /// `None` while the worker is still on site.
    pub exit_at: Option<DateTime<Utc>>,
    pub pause_minutes: u32,
    pub manually_edited: bool,
    pub entry_method: EntryMethod,
    pub edit_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Opens a new session with a fresh identifier.
    pub fn open(owner_id: &str, entry_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            entry_at,
            ..Default::default()
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.exit_at {
            Some(_) => SessionStatus::Finished,
            None => SessionStatus::Active,
        }
    }

    pub fn is_open(&self) -> bool {
        self.exit_at.is_none()
    }

    /// Elapsed minutes, measured against `now` while the session is open.
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        calculate_duration(self.entry_at, self.exit_at, now)
    }

    pub fn net_minutes(&self, now: DateTime<Utc>) -> i64 {
        net_minutes(self.duration_minutes(now), self.pause_minutes)
    }
}

/// An untyped row as delivered by a session store.
///
/// Field names follow the store schema; lineage variants (`geofence_*` vs
/// `location_*`, `user_id` vs `owner_id`) are accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "owner_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "geofence_id")]
    pub location_id: Option<String>,
    #[serde(default, alias = "geofence_name")]
    pub location_name: Option<String>,
    #[serde(default)]
    pub entry_at: Option<String>,
    #[serde(default)]
    pub exit_at: Option<String>,
    #[serde(default)]
    pub pause_minutes: Option<i64>,
    #[serde(default)]
    pub manually_edited: Option<bool>,
    #[serde(default)]
    pub entry_method: Option<String>,
    #[serde(default)]
    pub edit_reason: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl From<&Session> for SessionRow {
    fn from(session: &Session) -> Self {
        Self {
            id: Some(session.id.clone()),
            user_id: Some(session.owner_id.clone()),
            location_id: session.location_id.clone(),
            location_name: session.location_name.clone(),
            entry_at: Some(format_timestamp(session.entry_at)),
            exit_at: session.exit_at.map(format_timestamp),
            pause_minutes: Some(i64::from(session.pause_minutes)),
            manually_edited: Some(session.manually_edited),
            entry_method: Some(session.entry_method.as_str().to_string()),
            edit_reason: session.edit_reason.clone(),
            deleted_at: session.deleted_at.map(format_timestamp),
        }
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = TimekeeperError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let id = required(row.id, "id")?;
        let owner_id = required(row.user_id, "user_id")?;
        let entry_at = parse_timestamp(&required(row.entry_at, "entry_at")?)?;
        let exit_at = row.exit_at.as_deref().map(parse_timestamp).transpose()?;
        let deleted_at = row.deleted_at.as_deref().map(parse_timestamp).transpose()?;

        let pause_minutes = match row.pause_minutes.unwrap_or(0) {
            p if p < 0 => return Err(TimekeeperError::validation(format!("Negative pause_minutes on record {}", id))),
            p => u32::try_from(p).map_err(|_| TimekeeperError::validation(format!("pause_minutes out of range on record {}", id)))?,
        };

        let entry_method = match row.entry_method.as_deref() {
            Some(method) => method.parse()?,
            None => EntryMethod::default(),
        };

        Ok(Session {
            id,
            owner_id,
            location_id: row.location_id,
            location_name: row.location_name,
            entry_at,
            exit_at,
            pause_minutes,
            manually_edited: row.manually_edited.unwrap_or(false),
            entry_method,
            edit_reason: row.edit_reason,
            deleted_at,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TimekeeperError::validation(format!("Missing required field: {}", field))),
    }
}

/// Filters for [`SessionStore::query`].
#[derive(Debug, Clone)]
pub struct SessionQuery {
    pub owner_id: String,
    /// Inclusive bounds on `entry_at`.
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub include_deleted: bool,
}

impl SessionQuery {
    pub fn owner(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            from: None,
            to: None,
            include_deleted: false,
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }
}

/// Fields to change on an existing session. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub exit_at: Option<DateTime<Utc>>,
    pub pause_minutes: Option<u32>,
    pub manually_edited: Option<bool>,
    pub edit_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.exit_at.is_none()
            && self.pause_minutes.is_none()
            && self.manually_edited.is_none()
            && self.edit_reason.is_none()
            && self.deleted_at.is_none()
    }
}

/// Storage contract for time records.
pub trait SessionStore {
    /// Sessions matching `query`, ordered by `entry_at` ascending.
    /// Soft-deleted rows are excluded unless `include_deleted` is set.
    fn query(&mut self, query: &SessionQuery) -> Result<Vec<Session>>;

    fn get(&mut self, id: &str) -> Result<Option<Session>>;

    fn insert(&mut self, session: &Session) -> Result<()>;

    /// Applies `update` to the session with `id`; `NotFound` when absent.
    fn update(&mut self, id: &str, update: &SessionUpdate) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> SessionRow {
        SessionRow {
            id: Some("rec-1".to_string()),
            user_id: Some("worker-1".to_string()),
            entry_at: Some("2024-01-01T08:00:00.000Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_row_defaults() {
        let session = Session::try_from(row()).unwrap();
        assert_eq!(session.pause_minutes, 0);
        assert!(!session.manually_edited);
        assert_eq!(session.entry_method, EntryMethod::Automatic);
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn test_row_rejects_missing_required_fields() {
        let mut missing_id = row();
        missing_id.id = None;
        assert!(matches!(Session::try_from(missing_id), Err(TimekeeperError::Validation(_))));

        let mut missing_entry = row();
        missing_entry.entry_at = None;
        assert!(matches!(Session::try_from(missing_entry), Err(TimekeeperError::Validation(_))));

        let mut bad_entry = row();
        bad_entry.entry_at = Some("yesterday".to_string());
        assert!(matches!(Session::try_from(bad_entry), Err(TimekeeperError::Validation(_))));
    }

    #[test]
    fn test_row_rejects_negative_pause() {
        let mut negative = row();
        negative.pause_minutes = Some(-5);
        assert!(Session::try_from(negative).is_err());
    }

    #[test]
    fn test_row_accepts_lineage_aliases() {
        let json = r#"{
            "id": "rec-2",
            "owner_id": "worker-2",
            "geofence_id": "loc-1",
            "geofence_name": "Harbour Tower",
            "entry_at": "2024-03-04T12:00:00+00:00",
            "exit_at": "2024-03-04T20:30:00+00:00",
            "pause_minutes": null,
            "manually_edited": true
        }"#;
        let row: SessionRow = serde_json::from_str(json).unwrap();
        let session = Session::try_from(row).unwrap();
        assert_eq!(session.owner_id, "worker-2");
        assert_eq!(session.location_name.as_deref(), Some("Harbour Tower"));
        assert_eq!(session.location_id.as_deref(), Some("loc-1"));
        assert_eq!(session.pause_minutes, 0);
        assert!(session.manually_edited);
        assert_eq!(session.status(), SessionStatus::Finished);
        assert_eq!(session.duration_minutes(Utc::now()), 510);
    }

    #[test]
    fn test_status_is_derived_from_exit() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let mut session = Session::open("worker-1", entry);
        assert!(session.is_open());
        session.exit_at = Some(entry + chrono::Duration::hours(8));
        assert_eq!(session.status(), SessionStatus::Finished);
        assert_eq!(session.net_minutes(entry), 480);
    }

    #[test]
    fn test_row_from_session_uses_store_format() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let session = Session::open("worker-1", entry);
        let row = SessionRow::from(&session);
        assert_eq!(row.entry_at.as_deref(), Some("2024-01-01T08:00:00.000Z"));
        assert_eq!(row.entry_method.as_deref(), Some("automatic"));
    }
}
