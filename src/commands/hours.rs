use crate::{
    commands::{load_identity, worker_name},
    db::{dismissals::Dismissals, grants::Grants, sessions::Sessions},
    libs::{
        archive::DismissalCache,
        error::or_empty,
        export::{pending_hours_filename, write_report},
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
pub struct HoursArgs {
    #[arg(help = "Worker id [default: yourself]")]
    worker: Option<String>,
    #[arg(long, help = "Hide the listed entries from future runs on this device")]
    archive: bool,
    #[arg(long, value_name = "DIR", help = "Also write the report to a file in DIR")]
    export: Option<PathBuf>,
}

pub fn cmd(args: HoursArgs) -> Result<()> {
    let (config, user) = load_identity()?;
    let settings = config.report.settings();
    let now = Utc::now();
    let worker_id = args.worker.unwrap_or_else(|| user.id.clone());

    let mut access = AccessManager::new(Grants::new()?, config.access.policy());
    let name = worker_name(&mut access, &user, &worker_id)?;
    let mut sessions = Sessions::new()?;
    let mut dismissals = Dismissals::new()?.with_expiry_days(config.archive.expiry_days);

    let report = {
        let mut timesheet = Timesheet::new(&mut access, &mut sessions, settings, config.report.region_code.clone());
        let pending = timesheet.pending_hours_at(&user.id, &worker_id, &name, &mut dismissals, config.archive.history_days, now);
        or_empty(pending, "pending hours")?
    };

    if report.is_empty() {
        msg_info!(Message::NoPendingHours(name));
        return Ok(());
    }
    msg_print!(report.text);

    if let Some(dir) = args.export {
        let path = write_report(&dir, &pending_hours_filename(&name, settings.local_date(now)), &report.text)?;
        msg_success!(Message::ReportExported(path.display().to_string()));
    }
    if args.archive {
        let archived = dismissals.mark_dismissed(&report.entry_ids(), &worker_id, now)?;
        msg_success!(Message::EntriesArchived(archived));
    }
    Ok(())
}
