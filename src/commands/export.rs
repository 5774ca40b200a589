use crate::{
    commands::{load_identity, parse_day},
    db::{grants::Grants, sessions::Sessions},
    libs::{
        duration::DayWindow,
        error::or_empty,
        export::{ExportFormat, Exporter},
        grant::AccessManager,
        messages::Message,
        timesheet::Timesheet,
    },
    msg_info, msg_success,
};
use anyhow::Result;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(help = "Worker id [default: yourself]")]
    worker: Option<String>,
    #[arg(long, help = "First day, YYYY-MM-DD")]
    from: String,
    #[arg(long, help = "Last day, YYYY-MM-DD")]
    to: String,
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,
    #[arg(short, long, help = "Output file [default: timekeeper_export_<timestamp>.<ext>]")]
    output: Option<PathBuf>,
}

pub fn cmd(args: ExportArgs) -> Result<()> {
    let (config, user) = load_identity()?;
    let settings = config.report.settings();
    let now = Utc::now();
    let worker_id = args.worker.unwrap_or_else(|| user.id.clone());

    let first = parse_day(Some(&args.from), &settings, now)?;
    let last = parse_day(Some(&args.to), &settings, now)?;
    let window = DayWindow::spanning(first, last, settings.time_zone);

    let mut access = AccessManager::new(Grants::new()?, config.access.policy());
    let mut sessions = Sessions::new()?;
    let mut timesheet = Timesheet::new(&mut access, &mut sessions, settings, None);
    let found = or_empty(timesheet.authorized_sessions(&user.id, &worker_id, window.start, Some(window.end)), "sessions")?;
    if found.is_empty() {
        msg_info!(Message::NoEntriesForPeriod(settings.format_date(first), settings.format_date(last)));
        return Ok(());
    }

    let exporter = Exporter::new(args.format, args.output, now);
    let count = exporter.export(&found, &settings, now)?;
    msg_success!(Message::ExportCompleted(exporter.path().display().to_string(), count));
    Ok(())
}
