use crate::{
    commands::{load_identity, parse_day},
    db::{grants::Grants, sessions::Sessions},
    libs::{
        error::or_empty,
        export::{daily_filename, write_report},
        grant::AccessManager,
        messages::Message,
        timesheet::Timesheet,
    },
    msg_info, msg_print, msg_success,
};
use anyhow::Result;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(long, help = "YYYY-MM-DD [default: today]")]
    date: Option<String>,
    #[arg(long, value_name = "DIR", help = "Also write the report to a file in DIR")]
    export: Option<PathBuf>,
}

pub fn cmd(args: ReportArgs) -> Result<()> {
    let (config, user) = load_identity()?;
    let settings = config.report.settings();
    let now = Utc::now();
    let date = parse_day(args.date.as_deref(), &settings, now)?;

    let mut access = AccessManager::new(Grants::new()?, config.access.policy());
    let mut sessions = Sessions::new()?;
    let mut timesheet = Timesheet::new(&mut access, &mut sessions, settings, config.report.region_code.clone());

    // A daily report always has a header, so empty text means the read failed.
    let report = or_empty(timesheet.daily_at(&user.id, &user.name, date, now), "daily report")?;
    if report.text.is_empty() {
        msg_info!(Message::EntriesNotFound);
        return Ok(());
    }
    msg_print!(report.text);

    if let Some(dir) = args.export {
        let path = write_report(&dir, &daily_filename(date), &report.text)?;
        msg_success!(Message::ReportExported(path.display().to_string()));
    }
    Ok(())
}
