use crate::{
    commands::{load_identity, parse_day, worker_name},
    db::{grants::Grants, sessions::Sessions},
    libs::{
        error::or_empty,
        export::{range_filename, write_report},
        grant::AccessManager,
        messages::Message,
        report::DayKey,
        timesheet::{month_range, week_range, Timesheet},
    },
    msg_info, msg_print, msg_success,
};
use anyhow::Result;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TimesheetArgs {
    #[arg(help = "Worker id [default: yourself]")]
    worker: Option<String>,
    #[arg(long, conflicts_with = "month", help = "Sunday to Saturday around --date (default)")]
    week: bool,
    #[arg(long, help = "Calendar month around --date")]
    month: bool,
    #[arg(long, help = "Any day inside the period, YYYY-MM-DD [default: today]")]
    date: Option<String>,
    #[arg(long, value_name = "DIR", help = "Also write the report to a file in DIR")]
    export: Option<PathBuf>,
}

pub fn cmd(args: TimesheetArgs) -> Result<()> {
    let (config, user) = load_identity()?;
    let settings = config.report.settings();
    let now = Utc::now();
    let worker_id = args.worker.unwrap_or_else(|| user.id.clone());

    let day = parse_day(args.date.as_deref(), &settings, now)?;
    let (first, last) = if args.month && !args.week { month_range(day) } else { week_range(day) };

    let mut access = AccessManager::new(Grants::new()?, config.access.policy());
    let name = worker_name(&mut access, &user, &worker_id)?;
    let mut sessions = Sessions::new()?;
    let mut timesheet = Timesheet::new(&mut access, &mut sessions, settings, config.report.region_code.clone());

    let report = or_empty(timesheet.range_at(&user.id, &worker_id, &name, first, last, now), "timesheet")?;
    if report.is_empty() {
        msg_info!(Message::NoEntriesForPeriod(settings.format_date(first), settings.format_date(last)));
        return Ok(());
    }
    msg_print!(report.text);

    if let Some(dir) = args.export {
        let file_name = range_filename(&name, DayKey(first), DayKey(last));
        let path = write_report(&dir, &file_name, &report.text)?;
        msg_success!(Message::ReportExported(path.display().to_string()));
    }
    Ok(())
}
