use crate::{
    commands::{load_identity, parse_day},
    db::{locations::Locations, sessions::Sessions},
    libs::{
        duration::{format_duration, DayWindow},
        messages::Message,
        session::{SessionQuery, SessionRow, SessionStore},
        tracking::{parse_clock, ManualEntry, Tracker, DEFAULT_MANUAL_PAUSE_MINUTES},
        view::View,
    },
    msg_bail_anyhow, msg_info, msg_print, msg_success,
};
use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args)]
pub struct EntryArgs {
    #[command(subcommand)]
    command: EntryCommand,
}

#[derive(Debug, Subcommand)]
enum EntryCommand {
    /// Open a session at a location
    In { location: String },
    /// Close the open session
    Out {
        #[arg(long, help = "Break minutes to record")]
        pause: Option<u32>,
    },
    /// Enter finished hours by hand
    Add {
        #[arg(long)]
        location: String,
        #[arg(long, help = "YYYY-MM-DD [default: today]")]
        date: Option<String>,
        #[arg(long, default_value = "08:00")]
        entry: String,
        #[arg(long, default_value = "17:00")]
        exit: String,
        #[arg(long, default_value_t = DEFAULT_MANUAL_PAUSE_MINUTES)]
        pause: u32,
    },
    /// List entries of a day or a range
    List {
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<String>,
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    Delete { id: String },
    /// Import rows from a JSON array
    Import { file: PathBuf },
}

pub fn cmd(args: EntryArgs) -> Result<()> {
    let (config, user) = load_identity()?;
    let settings = config.report.settings();
    let now = Utc::now();

    let mut sessions = Sessions::new()?;
    let mut locations = Locations::new()?;
    let mut tracker = Tracker::new(&mut sessions, &mut locations, settings.time_zone);

    match args.command {
        EntryCommand::In { location } => {
            let session = tracker.check_in_at(&user.id, &location, now)?;
            msg_success!(Message::CheckedIn(
                session.location_name.unwrap_or_default(),
                settings.format_time(session.entry_at)
            ));
        }
        EntryCommand::Out { pause } => {
            let session = tracker.check_out_at(&user.id, pause, now)?;
            msg_success!(Message::CheckedOut(format_duration(session.net_minutes(now))));
        }
        EntryCommand::Add {
            location,
            date,
            entry,
            exit,
            pause,
        } => {
            let manual = ManualEntry {
                location_id: location,
                date: parse_day(date.as_deref(), &settings, now)?,
                entry_time: parse_clock(&entry)?,
                exit_time: parse_clock(&exit)?,
                pause_minutes: pause,
            };
            let session = tracker.add_manual(&user.id, &manual)?;
            msg_success!(Message::ManualEntryAdded(format_duration(session.net_minutes(now))));
        }
        EntryCommand::List { date, from, to } => {
            let (first, last) = match (from, to) {
                (Some(from), Some(to)) => (parse_day(Some(&from), &settings, now)?, parse_day(Some(&to), &settings, now)?),
                _ => {
                    let day = parse_day(date.as_deref(), &settings, now)?;
                    (day, day)
                }
            };
            let window = DayWindow::spanning(first, last, settings.time_zone);
            let found = sessions
                .query(&SessionQuery::owner(&user.id).between(window.start, window.end))
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to load entries");
                    Vec::new()
                });
            if found.is_empty() {
                msg_info!(Message::EntriesNotFound);
                return Ok(());
            }

            let range = if first == last { first.to_string() } else { format!("{} to {}", first, last) };
            msg_print!(Message::EntriesHeader(range), true);
            View::sessions(&found, &settings, now);
        }
        EntryCommand::Delete { id } => {
            tracker.delete_at(&user.id, &id, now)?;
            msg_success!(Message::EntryDeleted(id));
        }
        EntryCommand::Import { file } => {
            let text = fs::read_to_string(&file)?;
            let rows: Vec<SessionRow> = match serde_json::from_str(&text) {
                Ok(rows) => rows,
                Err(e) => msg_bail_anyhow!(Message::InvalidImportFile(e.to_string())),
            };
            let summary = tracker.import_rows(&user.id, rows)?;
            msg_success!(Message::ImportCompleted(summary.imported, summary.duplicates, summary.rejected));
        }
    }
    Ok(())
}
