//! Recording sessions: check-in, check-out, manual entries, soft delete and
//! JSON import.

use crate::libs::error::{Result, TimekeeperError};
use crate::libs::location::{Location, LocationStore};
use crate::libs::session::{EntryMethod, Session, SessionQuery, SessionRow, SessionStore, SessionUpdate};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

pub const DEFAULT_MANUAL_PAUSE_MINUTES: u32 = 30;
pub const MANUAL_EDIT_REASON: &str = "Manual entry";

/// Hours typed in after the fact.
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub location_id: String,
    /// Local calendar day of both entry and exit.
    pub date: NaiveDate,
    pub entry_time: NaiveTime,
    pub exit_time: NaiveTime,
    pub pause_minutes: u32,
}

/// Outcome of [`Tracker::import_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Writes sessions for one owner, resolving job sites through a location store.
pub struct Tracker<'a, S: SessionStore, L: LocationStore> {
    sessions: &'a mut S,
    locations: &'a mut L,
    time_zone: Tz,
}

impl<'a, S: SessionStore, L: LocationStore> Tracker<'a, S, L> {
    pub fn new(sessions: &'a mut S, locations: &'a mut L, time_zone: Tz) -> Self {
        Self {
            sessions,
            locations,
            time_zone,
        }
    }

    /// The owner's session without an exit, if any.
    pub fn open_session(&mut self, owner_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.query(&SessionQuery::owner(owner_id))?;
        Ok(sessions.into_iter().rev().find(Session::is_open))
    }

    pub fn check_in_at(&mut self, owner_id: &str, location_id: &str, now: DateTime<Utc>) -> Result<Session> {
        if let Some(open) = self.open_session(owner_id)? {
            return Err(TimekeeperError::validation(format!(
                "Already checked in at {}",
                open.location_name.as_deref().unwrap_or("Unknown Location")
            )));
        }
        let location = self.owned_location(owner_id, location_id)?;

        let mut session = Session::open(owner_id, now);
        session.location_id = Some(location.id);
        session.location_name = Some(location.name);
        session.entry_method = EntryMethod::Automatic;
        self.sessions.insert(&session)?;

        info!(session_id = %session.id, "Checked in");
        Ok(session)
    }

    pub fn check_out_at(&mut self, owner_id: &str, pause_minutes: Option<u32>, now: DateTime<Utc>) -> Result<Session> {
        let mut session = self
            .open_session(owner_id)?
            .ok_or_else(|| TimekeeperError::not_found("No open session to check out of"))?;

        session.exit_at = Some(now);
        if let Some(pause) = pause_minutes {
            session.pause_minutes = pause;
        }
        self.sessions.update(
            &session.id,
            &SessionUpdate {
                exit_at: session.exit_at,
                pause_minutes,
                ..Default::default()
            },
        )?;

        info!(session_id = %session.id, "Checked out");
        Ok(session)
    }

    /// Stores a finished session entered by hand.
    pub fn add_manual(&mut self, owner_id: &str, entry: &ManualEntry) -> Result<Session> {
        let location = self.owned_location(owner_id, &entry.location_id)?;

        let entry_at = self.resolve_local(entry.date, entry.entry_time)?;
        let exit_at = self.resolve_local(entry.date, entry.exit_time)?;
        if exit_at <= entry_at {
            return Err(TimekeeperError::validation("Exit time must be after entry time"));
        }

        let session = Session {
            location_id: Some(location.id),
            location_name: Some(location.name),
            exit_at: Some(exit_at),
            pause_minutes: entry.pause_minutes,
            manually_edited: true,
            entry_method: EntryMethod::Manual,
            edit_reason: Some(MANUAL_EDIT_REASON.to_string()),
            ..Session::open(owner_id, entry_at)
        };
        self.sessions.insert(&session)?;

        info!(session_id = %session.id, "Added manual entry");
        Ok(session)
    }

    /// Soft-deletes one of the owner's sessions.
    pub fn delete_at(&mut self, owner_id: &str, session_id: &str, now: DateTime<Utc>) -> Result<()> {
        let session = self
            .sessions
            .get(session_id)?
            .filter(|s| s.deleted_at.is_none())
            .ok_or_else(|| TimekeeperError::not_found(format!("Entry {}", session_id)))?;
        if session.owner_id != owner_id {
            return Err(TimekeeperError::AccessDenied);
        }

        self.sessions.update(
            session_id,
            &SessionUpdate {
                deleted_at: Some(now),
                ..Default::default()
            },
        )
    }

    /// Imports raw rows for `owner_id`.
    ///
    /// Rows that fail mapping or belong to another owner are rejected, rows
    /// whose id already exists are skipped.
    pub fn import_rows(&mut self, owner_id: &str, rows: Vec<SessionRow>) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for row in rows {
            let session = match Session::try_from(row) {
                Ok(session) if session.owner_id == owner_id => session,
                Ok(session) => {
                    warn!(session_id = %session.id, "Skipping row owned by another user");
                    summary.rejected += 1;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable row");
                    summary.rejected += 1;
                    continue;
                }
            };

            if self.sessions.get(&session.id)?.is_some() {
                summary.duplicates += 1;
                continue;
            }
            self.sessions.insert(&session)?;
            summary.imported += 1;
        }

        info!(imported = summary.imported, duplicates = summary.duplicates, rejected = summary.rejected, "Imported rows");
        Ok(summary)
    }

    fn owned_location(&mut self, owner_id: &str, location_id: &str) -> Result<Location> {
        self.locations
            .get(location_id)?
            .filter(|l| l.owner_id == owner_id && l.is_active())
            .ok_or_else(|| TimekeeperError::not_found("Location not found"))
    }

    fn resolve_local(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
        self.time_zone
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| TimekeeperError::validation(format!("{} {} does not exist in {}", date, time.format("%H:%M"), self.time_zone)))
    }
}

/// Parses `HH:MM`.
pub fn parse_clock(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| TimekeeperError::validation(format!("Invalid time: {} (expected HH:MM)", value)))
}
