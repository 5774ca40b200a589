//! Plain-text hour reports for sharing, copying and exporting.
//!
//! Two layouts exist: a single-day report and a multi-day report built from
//! an explicit list of day keys. Both are byte-stable for finished sessions:
//! rendering the same sessions twice on the same day yields identical text.
//! Open sessions are measured against the formatter's `now`, so they change
//! between renders.
//!
//! All calendar decisions (which day a session belongs to, how a time is
//! printed) go through [`ReportSettings`], never through the ambient locale.
//!
//! ## Usage
//!
//! ```rust
//! use onsite_timekeeper::libs::report::{DailyReport, ReportFormatter, ReportSettings};
//! use chrono::NaiveDate;
//!
//! let formatter = ReportFormatter::new(ReportSettings::default());
//! let text = formatter.daily(&DailyReport {
//!     user_name: "Alex Martin",
//!     user_id: "worker-1",
//!     date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
//!     sessions: &[],
//!     region_code: Some("QC"),
//! });
//! assert!(text.starts_with("Alex Martin\n"));
//! ```

use crate::libs::duration::{format_duration, DayWindow};
use crate::libs::error::TimekeeperError;
use crate::libs::ref_code::generate_ref_code;
use crate::libs::session::Session;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const APP_SIGNATURE: &str = "OnSite Timekeeper";
const HEADER_RULE: &str = "--------------------";
const FOOTER_RULE: &str = "====================";
const UNKNOWN_LOCATION: &str = "Unknown Location";
const IN_PROGRESS: &str = "In Progress";

/// Output locale for dates and times in reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    /// `"Jan 05, 24"`
    fn date_format(&self) -> &'static str {
        match self {
            Locale::EnUs => "%b %d, %y",
        }
    }

    /// `"8:05 AM"`
    fn time_format(&self) -> &'static str {
        match self {
            Locale::EnUs => "%-I:%M %p",
        }
    }
}

impl FromStr for Locale {
    type Err = TimekeeperError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "en-US" | "en_US" | "en" => Ok(Locale::EnUs),
            other => Err(TimekeeperError::Config(format!("Unsupported locale: {}", other))),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::EnUs => write!(f, "en-US"),
        }
    }
}

/// Locale and time zone threaded into every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub locale: Locale,
    pub time_zone: Tz,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            locale: Locale::EnUs,
            time_zone: Tz::UTC,
        }
    }
}

impl ReportSettings {
    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(self.locale.date_format()).to_string()
    }

    pub fn format_time(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.time_zone).format(self.locale.time_format()).to_string()
    }

    /// Calendar day of `instant` in the configured zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.time_zone).date_naive()
    }
}

/// A calendar day key in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(pub NaiveDate);

impl DayKey {
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl FromStr for DayKey {
    type Err = TimekeeperError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(DayKey)
            .map_err(|_| TimekeeperError::validation(format!("Invalid day key: {}", value)))
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        DayKey(date)
    }
}

/// Input for a single-day report.
pub struct DailyReport<'a> {
    pub user_name: &'a str,
    pub user_id: &'a str,
    pub date: NaiveDate,
    /// Sessions of that day, in display order.
    pub sessions: &'a [Session],
    pub region_code: Option<&'a str>,
}

/// Input for a multi-day report.
pub struct MultiDayReport<'a> {
    pub user_name: &'a str,
    pub user_id: &'a str,
    /// Day keys in the order they should appear.
    pub selected_days: &'a [DayKey],
    /// Every session considered, already narrowed to the relevant range.
    pub sessions: &'a [Session],
    pub region_code: Option<&'a str>,
}

/// Renders reports relative to a fixed `now`.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    settings: ReportSettings,
    now: DateTime<Utc>,
}

impl ReportFormatter {
    pub fn new(settings: ReportSettings) -> Self {
        Self::at(settings, Utc::now())
    }

    /// Formatter whose open sessions and reference date use `now`.
    pub fn at(settings: ReportSettings, now: DateTime<Utc>) -> Self {
        Self { settings, now }
    }

    pub fn daily(&self, report: &DailyReport<'_>) -> String {
        let mut out = self.header(report.user_name);
        let total = self.day_section(&mut out, report.date, report.sessions.iter());
        self.footer(&mut out, total, report.user_id, report.sessions.len(), report.region_code);
        out
    }

    /// Days without a matching session are skipped entirely. The reference
    /// code counts the whole `sessions` pool, not only the rendered ones.
    pub fn multi_day(&self, report: &MultiDayReport<'_>) -> String {
        let mut out = self.header(report.user_name);
        let mut grand_total = 0;

        for key in report.selected_days {
            let window = DayWindow::new(key.date(), self.settings.time_zone);
            let day_sessions: Vec<&Session> = report.sessions.iter().filter(|s| window.contains(s.entry_at)).collect();
            if day_sessions.is_empty() {
                continue;
            }

            let day_total = self.day_section(&mut out, key.date(), day_sessions.into_iter());
            out.push_str(&format!("Day Total: {}\n", format_duration(day_total)));
            out.push('\n');
            grand_total += day_total;
        }

        self.footer(&mut out, grand_total, report.user_id, report.sessions.len(), report.region_code);
        out
    }

    fn header(&self, user_name: &str) -> String {
        format!("{}\n{}\n", user_name, HEADER_RULE)
    }

    /// Writes the date line and one block per session; returns the net total.
    fn day_section<'s>(&self, out: &mut String, date: NaiveDate, sessions: impl Iterator<Item = &'s Session>) -> i64 {
        out.push_str(&format!("📅  {}\n", self.settings.format_date(date)));
        let mut total = 0;
        for session in sessions {
            total += self.session_block(out, session);
        }
        total
    }

    fn session_block(&self, out: &mut String, session: &Session) -> i64 {
        let entry = self.settings.format_time(session.entry_at);
        let exit = session
            .exit_at
            .map(|exit| self.settings.format_time(exit))
            .unwrap_or_else(|| IN_PROGRESS.to_string());
        let location = session.location_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(UNKNOWN_LOCATION);

        out.push_str(&format!("📍 {}\n", location));
        if session.manually_edited {
            out.push_str(&format!("*Edited ➜ {} -> {}\n", entry, exit));
        } else {
            out.push_str(&format!("➜ {} -> {}\n", entry, exit));
        }
        if session.pause_minutes > 0 {
            out.push_str(&format!("Break: {}min\n", session.pause_minutes));
        }

        let net = session.net_minutes(self.now);
        out.push_str(&format!("➜ {}\n", format_duration(net)));
        out.push('\n');
        net
    }

    fn footer(&self, out: &mut String, total: i64, user_id: &str, session_count: usize, region_code: Option<&str>) {
        let today = self.settings.local_date(self.now);
        out.push_str(&format!("{}\n", FOOTER_RULE));
        out.push_str(&format!("TOTAL: {}\n", format_duration(total)));
        out.push('\n');
        out.push_str(&format!("{}\n", APP_SIGNATURE));
        out.push_str(&format!("Ref #   {}\n", generate_ref_code(user_id, session_count, region_code, today)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn session(entry: DateTime<Utc>, exit: Option<DateTime<Utc>>, pause: u32, location: &str) -> Session {
        Session {
            id: format!("s-{}", entry.timestamp()),
            owner_id: "abcd1234-xyz".to_string(),
            location_name: Some(location.to_string()),
            entry_at: entry,
            exit_at: exit,
            pause_minutes: pause,
            ..Default::default()
        }
    }

    fn formatter() -> ReportFormatter {
        ReportFormatter::at(ReportSettings::default(), utc(5, 18, 0))
    }

    #[test]
    fn test_daily_report_layout() {
        let mut edited = session(utc(5, 13, 0), Some(utc(5, 16, 45)), 0, "Harbour Tower");
        edited.manually_edited = true;
        let sessions = vec![session(utc(5, 8, 0), Some(utc(5, 12, 30)), 30, "Main St Site"), edited];

        let text = formatter().daily(&DailyReport {
            user_name: "Alex Martin",
            user_id: "abcd1234-xyz",
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            sessions: &sessions,
            region_code: Some("QC"),
        });

        let expected = "Alex Martin\n\
--------------------\n\
📅  Jan 05, 24\n\
📍 Main St Site\n\
➜ 8:00 AM -> 12:30 PM\n\
Break: 30min\n\
➜ 4h\n\
\n\
📍 Harbour Tower\n\
*Edited ➜ 1:00 PM -> 4:45 PM\n\
➜ 3h 45min\n\
\n\
====================\n\
TOTAL: 7h 45min\n\
\n\
OnSite Timekeeper\n\
Ref #   QC-4XYZ-0105-02\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_open_session_renders_in_progress() {
        let sessions = vec![session(utc(5, 16, 0), None, 0, "")];
        let text = formatter().daily(&DailyReport {
            user_name: "Alex",
            user_id: "abcd1234-xyz",
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            sessions: &sessions,
            region_code: None,
        });
        assert!(text.contains("📍 Unknown Location\n"));
        assert!(text.contains("➜ 4:00 PM -> In Progress\n"));
        assert!(text.contains("➜ 2h\n"));
        assert!(text.ends_with("Ref #   XX-4XYZ-0105-01\n"));
    }

    #[test]
    fn test_multi_day_skips_days_without_sessions() {
        let sessions = vec![session(utc(1, 8, 0), Some(utc(1, 16, 0)), 30, "Main St Site")];
        let days: Vec<DayKey> = vec!["2024-01-01".parse().unwrap(), "2024-01-02".parse().unwrap()];

        let text = formatter().multi_day(&MultiDayReport {
            user_name: "Alex",
            user_id: "abcd1234-xyz",
            selected_days: &days,
            sessions: &sessions,
            region_code: Some("QC"),
        });

        assert_eq!(text.matches("📅").count(), 1);
        assert!(text.contains("📅  Jan 01, 24\n"));
        assert!(!text.contains("Jan 02, 24"));
        assert!(text.contains("Day Total: 7h 30min\n"));
        assert!(text.contains("TOTAL: 7h 30min\n"));
    }

    #[test]
    fn test_multi_day_ref_code_counts_whole_pool() {
        let sessions = vec![
            session(utc(1, 8, 0), Some(utc(1, 9, 0)), 0, "A"),
            session(utc(3, 8, 0), Some(utc(3, 9, 0)), 0, "B"),
            session(utc(4, 8, 0), Some(utc(4, 9, 0)), 0, "C"),
        ];
        let days = vec![DayKey::from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())];
        let text = formatter().multi_day(&MultiDayReport {
            user_name: "Alex",
            user_id: "abcd1234-xyz",
            selected_days: &days,
            sessions: &sessions,
            region_code: Some("QC"),
        });
        assert!(text.contains("TOTAL: 1h\n"));
        assert!(text.ends_with("Ref #   QC-4XYZ-0105-03\n"));
    }

    #[test]
    fn test_multi_day_empty_has_header_and_zero_total() {
        let days: Vec<DayKey> = vec!["2024-01-01".parse().unwrap()];
        let text = formatter().multi_day(&MultiDayReport {
            user_name: "Alex",
            user_id: "abcd1234-xyz",
            selected_days: &days,
            sessions: &[],
            region_code: Some("QC"),
        });
        assert_eq!(
            text,
            "Alex\n--------------------\n====================\nTOTAL: 0min\n\nOnSite Timekeeper\nRef #   QC-4XYZ-0105-00\n"
        );
    }

    #[test]
    fn test_rendering_finished_sessions_is_idempotent() {
        let sessions = vec![
            session(utc(1, 8, 0), Some(utc(1, 12, 0)), 15, "A"),
            session(utc(2, 7, 30), Some(utc(2, 15, 0)), 30, "B"),
        ];
        let days: Vec<DayKey> = vec!["2024-01-01".parse().unwrap(), "2024-01-02".parse().unwrap()];
        let report = MultiDayReport {
            user_name: "Alex",
            user_id: "abcd1234-xyz",
            selected_days: &days,
            sessions: &sessions,
            region_code: Some("QC"),
        };
        let f = formatter();
        assert_eq!(f.multi_day(&report), f.multi_day(&report));
    }

    #[test]
    fn test_time_zone_moves_sessions_between_days() {
        // 02:00 UTC on Jan 2 is 9 PM on Jan 1 in Toronto.
        let sessions = vec![session(utc(2, 2, 0), Some(utc(2, 4, 0)), 0, "Night Shift")];
        let days: Vec<DayKey> = vec!["2024-01-01".parse().unwrap(), "2024-01-02".parse().unwrap()];
        let settings = ReportSettings {
            locale: Locale::EnUs,
            time_zone: chrono_tz::America::Toronto,
        };
        let text = ReportFormatter::at(settings, utc(5, 18, 0)).multi_day(&MultiDayReport {
            user_name: "Alex",
            user_id: "abcd1234-xyz",
            selected_days: &days,
            sessions: &sessions,
            region_code: Some("QC"),
        });
        assert!(text.contains("📅  Jan 01, 24\n"));
        assert!(!text.contains("Jan 02, 24"));
        assert!(text.contains("➜ 9:00 PM -> 11:00 PM\n"));
    }

    #[test]
    fn test_day_key_round_trip_and_validation() {
        let key: DayKey = "2024-02-29".parse().unwrap();
        assert_eq!(key.to_string(), "2024-02-29");
        assert!("2024-13-01".parse::<DayKey>().is_err());
    }
}
