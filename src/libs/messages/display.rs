//! Text of every [`Message`] variant.
//!
//! Kept in one match so wording stays consistent across commands:
//! sentence case, no trailing period on single-line confirmations.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let text = match self {
            // === CONFIGURATION ===
            Message::ConfigSectionUser => "Identity".to_string(),
            Message::ConfigSectionReport => "Reports".to_string(),
            Message::ConfigSectionAccess => "Team access".to_string(),
            Message::PromptUserId => "User id".to_string(),
            Message::PromptUserName => "Display name".to_string(),
            Message::PromptTimeZone => "Time zone (IANA name, e.g. America/Toronto)".to_string(),
            Message::PromptRegionCode => "Region code for references (e.g. QC, blank for none)".to_string(),
            Message::PromptRequireApproval => "Require your approval before a manager can see your hours?".to_string(),
            Message::InvalidTimeZone(zone) => format!("Unknown time zone: {}", zone),
            Message::ConfigSaved(path) => format!("Configuration saved to {}", path),
            Message::NoIdentityConfigured => "No identity configured. Run `onsite init` first.".to_string(),

            // === MIGRATIONS ===
            Message::DatabaseUpToDate => "Database is up to date".to_string(),
            Message::MigrationsFound(count) => format!("Found {} pending migration(s)", count),
            Message::RunningMigration(version, name) => format!("Running migration v{}: {}", version, name),
            Message::MigrationCompleted(version) => format!("Migration v{} completed", version),
            Message::MigrationFailed(version, error) => format!("Migration v{} failed: {}", version, error),
            Message::AllMigrationsCompleted => "All migrations completed".to_string(),

            // === LOCATIONS ===
            Message::LocationCreated(name, id) => format!("Location '{}' created ({})", name, id),
            Message::LocationRenamed(name) => format!("Location renamed to '{}'", name),
            Message::LocationDeleted(id) => format!("Location {} deleted", id),
            Message::LocationsNotFound => "No locations yet. Add one with `onsite location add`.".to_string(),
            Message::LocationsHeader => "Locations".to_string(),

            // === ENTRIES ===
            Message::CheckedIn(location, time) => format!("Checked in at {} ({})", location, time),
            Message::CheckedOut(duration) => format!("Checked out. Worked {}", duration),
            Message::ManualEntryAdded(duration) => format!("Hours saved: {}", duration),
            Message::EntryDeleted(id) => format!("Entry {} deleted", id),
            Message::EntriesNotFound => "No entries found".to_string(),
            Message::EntriesHeader(range) => format!("Entries for {}", range),
            Message::ImportCompleted(imported, duplicates, rejected) => {
                format!("Imported {} entries ({} already present, {} rejected)", imported, duplicates, rejected)
            }
            Message::InvalidImportFile(error) => format!("Cannot read import file: {}", error),

            // === REPORTS ===
            Message::ReportExported(path) => format!("Report exported to {}", path),
            Message::NoPendingHours(name) => format!("No pending hours for {}", name),
            Message::NoEntriesForPeriod(first, last) => format!("No entries to export for {} to {}", first, last),
            Message::EntriesArchived(count) => format!("{} entries archived", count),
            Message::InvalidDate(value) => format!("Invalid date: {} (expected YYYY-MM-DD)", value),

            // === TEAM ===
            Message::TokenGenerated(expires) => format!("Link code valid until {}", expires),
            Message::QrPayloadHint => "Show this code to your manager; they run `onsite team scan '<code>'`:".to_string(),
            Message::LinkedToWorker(name) => format!("You can now see {}'s hours", name),
            Message::LinkPendingApproval(name) => format!("Request sent. Waiting for {} to approve", name),
            Message::GrantApproved(id) => format!("Access {} approved", id),
            Message::GrantRevoked(id) => format!("Access {} revoked", id),
            Message::NoGrants => "No team links yet".to_string(),
            Message::SharedWithHeader => "People who can see your hours".to_string(),
            Message::WorkersHeader => "Workers you can view".to_string(),

            // === EXPORT ===
            Message::ExportCompleted(path, count) => format!("Exported {} entries to {}", count, path),

            // === GENERIC ===
            Message::CommandFailed(error) => error.clone(),
        };
        write!(f, "{}", text)
    }
}
