//! Command-line interface.
//!
//! Each subcommand lives in its own module and exposes `cmd(args)`. They
//! share the same preamble: read the configuration, resolve the identity,
//! open the stores they need.

pub mod entry;
pub mod export;
pub mod hours;
pub mod init;
pub mod location;
pub mod report;
pub mod team;
pub mod timesheet;

use crate::libs::config::{Config, UserConfig};
use crate::libs::error::or_empty;
use crate::libs::grant::{AccessManager, GrantStore};
use crate::libs::messages::Message;
use crate::libs::report::{DayKey, ReportSettings};
use crate::msg_bail_anyhow;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configure identity, report settings and team access")]
    Init(init::InitArgs),
    #[command(about = "Manage job site locations")]
    Location(location::LocationArgs),
    #[command(about = "Check in, check out and manage time entries")]
    Entry(entry::EntryArgs),
    #[command(about = "Print today's report or the report of a given day")]
    Report(report::ReportArgs),
    #[command(about = "Share your hours with a manager or link to a worker")]
    Team(team::TeamArgs),
    #[command(about = "Pending hours of a worker, not yet archived on this device")]
    Hours(hours::HoursArgs),
    #[command(about = "Week or month report of a worker")]
    Timesheet(timesheet::TimesheetArgs),
    #[command(about = "Export a worker's entries to CSV or JSON")]
    Export(export::ExportArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn menu() -> Result<()> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args),
            Commands::Location(args) => location::cmd(args),
            Commands::Entry(args) => entry::cmd(args),
            Commands::Report(args) => report::cmd(args),
            Commands::Team(args) => team::cmd(args),
            Commands::Hours(args) => hours::cmd(args),
            Commands::Timesheet(args) => timesheet::cmd(args),
            Commands::Export(args) => export::cmd(args),
        }
    }
}

/// Configuration plus the identity every command acts as.
pub(crate) fn load_identity() -> Result<(Config, UserConfig)> {
    let config = Config::read()?;
    let user = config.identity()?.clone();
    Ok((config, user))
}

/// `YYYY-MM-DD`, or today in the report time zone when absent.
pub(crate) fn parse_day(value: Option<&str>, settings: &ReportSettings, now: DateTime<Utc>) -> Result<NaiveDate> {
    match value {
        None => Ok(settings.local_date(now)),
        Some(value) => match value.parse::<DayKey>() {
            Ok(key) => Ok(key.date()),
            Err(_) => msg_bail_anyhow!(Message::InvalidDate(value.to_string())),
        },
    }
}

/// Display name for `worker_id` as seen by `me`.
///
/// Your own name for your own id; otherwise the name captured when the link
/// was made, falling back to the id. That includes a grant store that
/// cannot be read.
pub(crate) fn worker_name<G: GrantStore>(access: &mut AccessManager<G>, me: &UserConfig, worker_id: &str) -> Result<String> {
    if worker_id == me.id {
        return Ok(if me.name.trim().is_empty() { me.id.clone() } else { me.name.clone() });
    }
    let label = or_empty(access.viewer_grants(&me.id), "worker grants")?
        .into_iter()
        .find(|g| g.owner_id == worker_id)
        .and_then(|g| g.label)
        .filter(|l| !l.trim().is_empty());
    Ok(label.unwrap_or_else(|| worker_id.to_string()))
}
