use super::duration::format_duration;
use super::grant::AccessGrant;
use super::location::Location;
use super::report::ReportSettings;
use super::session::Session;
use chrono::{DateTime, Utc};
use prettytable::{row, Table};

/// Terminal tables.
pub struct View {}

impl View {
    pub fn locations(locations: &[Location]) {
        let mut table = Table::new();

        table.add_row(row!["ID", "NAME", "LATITUDE", "LONGITUDE", "RADIUS (M)", "COLOR"]);
        for location in locations {
            table.add_row(row![
                location.id,
                location.name,
                format!("{:.6}", location.latitude),
                format!("{:.6}", location.longitude),
                format!("{:.0}", location.radius),
                location.color
            ]);
        }
        table.printstd();
    }

    pub fn sessions(sessions: &[Session], settings: &ReportSettings, now: DateTime<Utc>) {
        let mut table = Table::new();

        table.add_row(row!["ID", "DATE", "LOCATION", "ENTRY", "EXIT", "BREAK", "NET", "METHOD"]);
        for session in sessions {
            let exit = session.exit_at.map(|exit| settings.format_time(exit)).unwrap_or_else(|| "In Progress".to_string());
            let method = if session.manually_edited {
                format!("{}*", session.entry_method.as_str())
            } else {
                session.entry_method.as_str().to_string()
            };
            table.add_row(row![
                session.id,
                settings.format_date(settings.local_date(session.entry_at)),
                session.location_name.as_deref().unwrap_or("-"),
                settings.format_time(session.entry_at),
                exit,
                format!("{}min", session.pause_minutes),
                format_duration(session.net_minutes(now)),
                method
            ]);
        }
        table.printstd();
    }

    /// Grants as seen by the owner (`viewer` column) or the viewer (`owner` column).
    pub fn grants(grants: &[AccessGrant], settings: &ReportSettings, as_owner: bool) {
        let mut table = Table::new();

        let counterpart = if as_owner { "VIEWER" } else { "WORKER" };
        table.add_row(row!["ID", counterpart, "STATUS", "LINKED", "ACCEPTED"]);
        for grant in grants {
            let who = if as_owner {
                grant.viewer_id.clone()
            } else {
                match &grant.label {
                    Some(name) if !name.is_empty() => format!("{} ({})", name, grant.owner_id),
                    _ => grant.owner_id.clone(),
                }
            };
            let accepted = grant
                .accepted_at
                .map(|at| settings.format_date(settings.local_date(at)))
                .unwrap_or_else(|| "-".to_string());
            table.add_row(row![
                grant.id,
                who,
                grant.status,
                settings.format_date(settings.local_date(grant.created_at)),
                accepted
            ]);
        }
        table.printstd();
    }
}
