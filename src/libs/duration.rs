//! Duration engine: elapsed minutes, net minutes and their aggregates.
//!
//! Everything here is pure arithmetic over instants supplied by the caller.
//! Nothing fails. Elapsed time is clamped at zero against clock skew, while
//! net time (elapsed minus break) is passed through unclamped so a break
//! longer than the shift shows up as a negative contribution.
//!
//! ## Usage
//!
//! ```rust
//! use onsite_timekeeper::libs::duration::{calculate_duration, format_duration};
//! use chrono::{TimeZone, Utc};
//!
//! let entry = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
//! let exit = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
//! let minutes = calculate_duration(entry, Some(exit), Utc::now());
//! assert_eq!(format_duration(minutes), "1h 30min");
//! ```

use crate::libs::session::Session;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Whole minutes between `entry` and `exit` (or `now` when the session is open).
///
/// Rounds half-minutes up and never returns a negative value.
pub fn calculate_duration(entry: DateTime<Utc>, exit: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    let end = exit.unwrap_or(now);
    let millis = (end - entry).num_milliseconds();
    (millis + MILLIS_PER_MINUTE / 2).div_euclid(MILLIS_PER_MINUTE).max(0)
}

/// Duration minus break. May be negative.
pub fn net_minutes(duration_minutes: i64, pause_minutes: u32) -> i64 {
    duration_minutes - i64::from(pause_minutes)
}

/// Sum of net minutes across all sessions.
pub fn total_net_minutes<'a, I>(sessions: I, now: DateTime<Utc>) -> i64
where
    I: IntoIterator<Item = &'a Session>,
{
    sessions.into_iter().map(|s| s.net_minutes(now)).sum()
}

/// Sum of net minutes for sessions whose entry falls on `day` in `tz`.
pub fn day_net_minutes(sessions: &[Session], day: NaiveDate, tz: Tz, now: DateTime<Utc>) -> i64 {
    let window = DayWindow::new(day, tz);
    total_net_minutes(sessions.iter().filter(|s| window.contains(s.entry_at)), now)
}

/// The `[00:00:00.000, 23:59:59.999]` local window of a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn new(day: NaiveDate, tz: Tz) -> Self {
        let start = local_midnight(day, tz);
        let end = match day.succ_opt() {
            Some(next) => local_midnight(next, tz) - Duration::milliseconds(1),
            None => DateTime::<Utc>::MAX_UTC,
        };
        Self { start, end }
    }

    /// Window spanning from the start of `first` to the end of `last`.
    pub fn spanning(first: NaiveDate, last: NaiveDate, tz: Tz) -> Self {
        Self {
            start: Self::new(first, tz).start,
            end: Self::new(last, tz).end,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

fn local_midnight(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts at the first valid local instant.
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// Renders minutes as `"45min"`, `"2h"` or `"2h 15min"`.
///
/// Hours are floored and minutes use the truncated remainder, so negative
/// totals render as e.g. `"-1h -10min"` for -10.
pub fn format_duration(minutes: i64) -> String {
    let hours = minutes.div_euclid(60);
    let mins = minutes % 60;

    if hours == 0 {
        format!("{}min", mins)
    } else if mins == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}min", hours, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    fn finished(entry: DateTime<Utc>, exit: DateTime<Utc>, pause: u32) -> Session {
        Session {
            entry_at: entry,
            exit_at: Some(exit),
            pause_minutes: pause,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0min");
        assert_eq!(format_duration(45), "45min");
        assert_eq!(format_duration(60), "1h");
        assert_eq!(format_duration(90), "1h 30min");
        assert_eq!(format_duration(600), "10h");
    }

    #[test]
    fn test_format_duration_negative_keeps_floor_and_remainder() {
        assert_eq!(format_duration(-10), "-1h -10min");
        assert_eq!(format_duration(-60), "-1h");
    }

    #[test]
    fn test_duration_rounds_half_minutes_up() {
        let entry = at(8, 0, 0);
        assert_eq!(calculate_duration(entry, Some(at(8, 0, 29)), entry), 0);
        assert_eq!(calculate_duration(entry, Some(at(8, 0, 30)), entry), 1);
        assert_eq!(calculate_duration(entry, Some(at(8, 1, 29)), entry), 1);
    }

    #[test]
    fn test_duration_clamps_clock_skew() {
        assert_eq!(calculate_duration(at(9, 0, 0), Some(at(8, 0, 0)), at(9, 0, 0)), 0);
    }

    #[test]
    fn test_open_session_grows_with_now() {
        let entry = at(8, 0, 0);
        let earlier = calculate_duration(entry, None, at(9, 0, 0));
        let later = calculate_duration(entry, None, at(10, 15, 0));
        assert_eq!(earlier, 60);
        assert_eq!(later, 135);
        assert!(later >= earlier);
    }

    #[test]
    fn test_net_minutes_may_go_negative() {
        assert_eq!(net_minutes(20, 30), -10);
    }

    #[test]
    fn test_negative_contribution_is_not_clamped_in_aggregate() {
        let sessions = vec![
            finished(at(6, 0, 0), at(8, 30, 0), 30),   // 120
            finished(at(9, 0, 0), at(9, 20, 0), 30),   // -10
            finished(at(10, 0, 0), at(15, 30, 0), 30), // 300
        ];
        let now = at(16, 0, 0);
        assert_eq!(total_net_minutes(&sessions, now), 410);
        assert_eq!(day_net_minutes(&sessions, at(0, 0, 0).date_naive(), Tz::UTC, now), 410);
    }

    #[test]
    fn test_day_window_bounds() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let window = DayWindow::new(day, Tz::UTC);
        assert!(window.contains(at(0, 0, 0)));
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap() + Duration::milliseconds(999)));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_day_window_follows_time_zone() {
        // 03:00 UTC on Jan 2 is still Jan 1 in Toronto (UTC-5).
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let window = DayWindow::new(day, chrono_tz::America::Toronto);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap());
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 1, 1, 4, 59, 59).unwrap()));
    }

    #[test]
    fn test_day_net_minutes_only_counts_that_day() {
        let sessions = vec![
            finished(at(8, 0, 0), at(12, 0, 0), 0),
            finished(
                Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
                0,
            ),
        ];
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(day_net_minutes(&sessions, day, Tz::UTC, at(13, 0, 0)), 60);
    }
}
