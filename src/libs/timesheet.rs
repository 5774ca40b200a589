//! Assembles reports from stored sessions: the owner's own day, a viewer's
//! week or month of a worker's timesheet, and the "pending hours" view.
//!
//! Every read of another identity's sessions goes through
//! [`AccessManager::authorize_read`] before the store is touched.

use crate::libs::archive::{without_dismissed, DismissalCache};
use crate::libs::duration::{total_net_minutes, DayWindow};
use crate::libs::error::{Result, TimekeeperError};
use crate::libs::grant::{AccessManager, GrantStore};
use crate::libs::report::{DailyReport, DayKey, MultiDayReport, ReportFormatter, ReportSettings};
use crate::libs::session::{Session, SessionQuery, SessionStore};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub const DEFAULT_HISTORY_DAYS: i64 = 60;

/// Sunday through Saturday containing `date`.
pub fn week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    let start = date - Days::new(offset);
    (start, start + Days::new(6))
}

/// First through last day of `date`'s month.
pub fn month_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);
    (first, last)
}

/// Distinct local days on which the sessions started, ascending.
pub fn day_keys_of(sessions: &[Session], settings: &ReportSettings) -> Vec<DayKey> {
    let keys: BTreeSet<DayKey> = sessions.iter().map(|s| DayKey(settings.local_date(s.entry_at))).collect();
    keys.into_iter().collect()
}

/// A rendered report and the sessions it was built from.
#[derive(Debug, Clone, Default)]
pub struct HoursReport {
    pub sessions: Vec<Session>,
    pub day_keys: Vec<DayKey>,
    pub total_minutes: i64,
    pub text: String,
}

impl HoursReport {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn entry_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.id.clone()).collect()
    }

    pub fn first_day(&self) -> Option<DayKey> {
        self.day_keys.first().copied()
    }

    pub fn last_day(&self) -> Option<DayKey> {
        self.day_keys.last().copied()
    }
}

pub struct Timesheet<'a, G: GrantStore, S: SessionStore> {
    access: &'a mut AccessManager<G>,
    sessions: &'a mut S,
    settings: ReportSettings,
    region_code: Option<String>,
}

impl<'a, G: GrantStore, S: SessionStore> Timesheet<'a, G, S> {
    pub fn new(access: &'a mut AccessManager<G>, sessions: &'a mut S, settings: ReportSettings, region_code: Option<String>) -> Self {
        Self {
            access,
            sessions,
            settings,
            region_code,
        }
    }

    /// Sessions of `owner_id` started within `[from, to]`, after checking
    /// that `requester_id` may read them.
    pub fn authorized_sessions(&mut self, requester_id: &str, owner_id: &str, from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> Result<Vec<Session>> {
        self.access.authorize_read(requester_id, owner_id)?;

        let mut query = SessionQuery::owner(owner_id).since(from);
        query.to = to;
        let sessions = self.sessions.query(&query)?;
        debug!(owner_id, count = sessions.len(), "Loaded sessions");
        Ok(sessions)
    }

    /// The owner's own report for one local day.
    pub fn daily_at(&mut self, owner_id: &str, user_name: &str, date: NaiveDate, now: DateTime<Utc>) -> Result<HoursReport> {
        let window = DayWindow::new(date, self.settings.time_zone);
        let sessions = self.authorized_sessions(owner_id, owner_id, window.start, Some(window.end))?;

        let formatter = ReportFormatter::at(self.settings, now);
        let text = formatter.daily(&DailyReport {
            user_name,
            user_id: owner_id,
            date,
            sessions: &sessions,
            region_code: self.region_code.as_deref(),
        });

        Ok(HoursReport {
            total_minutes: total_net_minutes(&sessions, now),
            day_keys: vec![DayKey(date)],
            sessions,
            text,
        })
    }

    /// Multi-day report over `first..=last` local days.
    pub fn range_at(
        &mut self,
        requester_id: &str,
        owner_id: &str,
        owner_name: &str,
        first: NaiveDate,
        last: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<HoursReport> {
        let window = DayWindow::spanning(first, last, self.settings.time_zone);
        let sessions = self.authorized_sessions(requester_id, owner_id, window.start, Some(window.end))?;
        Ok(self.multi_day(owner_id, owner_name, sessions, now))
    }

    /// Everything the worker logged in the last `history_days` days that this
    /// device has not dismissed yet.
    ///
    /// Expired dismissal markers are swept afterwards; a failing sweep is
    /// logged and otherwise ignored.
    pub fn pending_hours_at<D: DismissalCache>(
        &mut self,
        requester_id: &str,
        owner_id: &str,
        owner_name: &str,
        cache: &mut D,
        history_days: i64,
        now: DateTime<Utc>,
    ) -> Result<HoursReport> {
        let from = Duration::try_days(history_days)
            .filter(|_| history_days > 0)
            .and_then(|history| now.checked_sub_signed(history))
            .ok_or_else(|| TimekeeperError::validation(format!("History of {} days is out of range", history_days)))?;
        let sessions = self.authorized_sessions(requester_id, owner_id, from, None)?;
        let dismissed = cache.dismissed_ids(owner_id)?;
        let pending = without_dismissed(sessions, &dismissed);

        let report = self.multi_day(owner_id, owner_name, pending, now);

        if let Err(e) = cache.sweep_expired(now) {
            warn!(error = %e, "Failed to sweep expired dismissals");
        }
        Ok(report)
    }

    fn multi_day(&self, owner_id: &str, owner_name: &str, sessions: Vec<Session>, now: DateTime<Utc>) -> HoursReport {
        let day_keys = day_keys_of(&sessions, &self.settings);
        let text = if sessions.is_empty() {
            String::new()
        } else {
            ReportFormatter::at(self.settings, now).multi_day(&MultiDayReport {
                user_name: owner_name,
                user_id: owner_id,
                selected_days: &day_keys,
                sessions: &sessions,
                region_code: self.region_code.as_deref(),
            })
        };

        HoursReport {
            total_minutes: total_net_minutes(&sessions, now),
            day_keys,
            sessions,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_range_starts_on_sunday() {
        // 2024-01-10 is a Wednesday.
        assert_eq!(week_range(date(2024, 1, 10)), (date(2024, 1, 7), date(2024, 1, 13)));
        assert_eq!(week_range(date(2024, 1, 7)), (date(2024, 1, 7), date(2024, 1, 13)));
        assert_eq!(week_range(date(2024, 1, 13)), (date(2024, 1, 7), date(2024, 1, 13)));
    }

    #[test]
    fn test_month_range() {
        assert_eq!(month_range(date(2024, 2, 14)), (date(2024, 2, 1), date(2024, 2, 29)));
        assert_eq!(month_range(date(2023, 12, 31)), (date(2023, 12, 1), date(2023, 12, 31)));
    }

    #[test]
    fn test_day_keys_are_distinct_and_sorted() {
        let at = |d, h| Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap();
        let sessions: Vec<Session> = [at(3, 9), at(1, 8), at(3, 14), at(2, 2)]
            .into_iter()
            .map(|entry_at| Session {
                entry_at,
                ..Default::default()
            })
            .collect();

        let utc_keys: Vec<String> = day_keys_of(&sessions, &ReportSettings::default()).iter().map(ToString::to_string).collect();
        assert_eq!(utc_keys, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);

        // 02:00 UTC on Jan 2 is Jan 1 in Toronto.
        let toronto = ReportSettings {
            time_zone: chrono_tz::America::Toronto,
            ..Default::default()
        };
        let local_keys: Vec<String> = day_keys_of(&sessions, &toronto).iter().map(ToString::to_string).collect();
        assert_eq!(local_keys, vec!["2024-01-01", "2024-01-03"]);
    }
}
