//! Writing reports and session rows to disk.
//!
//! Text reports go out under fixed file names so repeated exports of the same
//! range overwrite each other. Session rows can be exported as CSV for
//! spreadsheets or as JSON in the same row shape `entry import` reads.

use crate::libs::error::Result;
use crate::libs::report::{DayKey, ReportSettings};
use crate::libs::session::{Session, SessionRow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Spreadsheet-friendly, one line per session
    #[default]
    Csv,
    /// Raw rows, re-importable
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// One CSV line. Times are local to the report time zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub id: String,
    pub date: String,
    pub location: String,
    pub entry: String,
    pub exit: String,
    pub pause_minutes: u32,
    pub net_minutes: i64,
    pub status: String,
    pub edited: bool,
}

impl ExportRow {
    pub fn from_session(session: &Session, settings: &ReportSettings, now: DateTime<Utc>) -> Self {
        let local = |instant: DateTime<Utc>| instant.with_timezone(&settings.time_zone).format("%H:%M").to_string();
        Self {
            id: session.id.clone(),
            date: DayKey(settings.local_date(session.entry_at)).to_string(),
            location: session.location_name.clone().unwrap_or_default(),
            entry: local(session.entry_at),
            exit: session.exit_at.map(local).unwrap_or_default(),
            pause_minutes: session.pause_minutes,
            net_minutes: session.net_minutes(now),
            status: session.status().to_string(),
            edited: session.manually_edited,
        }
    }
}

/// Collapses whitespace runs into `-` for use in file names.
pub fn file_slug(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}

/// `Alex-Martin-hours-2024-01-05.txt`
pub fn pending_hours_filename(worker_name: &str, today: NaiveDate) -> String {
    format!("{}-hours-{}.txt", file_slug(worker_name), DayKey(today))
}

/// `Alex-Martin-report-2024-01-01-to-2024-01-05.txt`
pub fn range_filename(worker_name: &str, first: DayKey, last: DayKey) -> String {
    format!("{}-report-{}-to-{}.txt", file_slug(worker_name), first, last)
}

/// `timekeeper-report-2024-01-05.txt`
pub fn daily_filename(date: NaiveDate) -> String {
    format!("timekeeper-report-{}.txt", DayKey(date))
}

/// Writes `text` to `dir/file_name`, creating `dir` if needed.
pub fn write_report(dir: &Path, file_name: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    File::create(&path)?.write_all(text.as_bytes())?;
    Ok(path)
}

/// Serializes sessions as CSV into any writer.
pub fn write_csv<W: Write>(writer: W, sessions: &[Session], settings: &ReportSettings, now: DateTime<Utc>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for session in sessions {
        wtr.serialize(ExportRow::from_session(session, settings, now))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes sessions to a file in the chosen format.
pub struct Exporter {
    format: ExportFormat,
    output_path: PathBuf,
}

impl Exporter {
    pub fn new(format: ExportFormat, output_path: Option<PathBuf>, now: DateTime<Utc>) -> Self {
        let output_path = output_path.unwrap_or_else(|| PathBuf::from(format!("timekeeper_export_{}.{}", now.format("%Y%m%d_%H%M%S"), format.extension())));
        Self { format, output_path }
    }

    pub fn path(&self) -> &Path {
        &self.output_path
    }

    pub fn export(&self, sessions: &[Session], settings: &ReportSettings, now: DateTime<Utc>) -> Result<usize> {
        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.output_path)?;

        match self.format {
            ExportFormat::Csv => write_csv(file, sessions, settings, now)?,
            ExportFormat::Json => {
                let rows: Vec<SessionRow> = sessions.iter().map(SessionRow::from).collect();
                serde_json::to_writer_pretty(file, &rows)?;
            }
        }
        Ok(sessions.len())
    }
}
