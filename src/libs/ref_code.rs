//! Human-copyable reference codes printed at the foot of every report.
//!
//! A code looks like `QC-1234-0105-03`: region, the last four characters of
//! the owner id, the generation date as `MMDD`, and the number of sessions the
//! report considered. It is a traceability aid for people comparing printed
//! reports and carries no authority; never use it for access decisions.

use chrono::{Datelike, NaiveDate};

/// Region used when none is configured.
pub const DEFAULT_REGION_CODE: &str = "XX";

/// Highest session count the two-digit field can show.
const MAX_SESSIONS: usize = 99;

/// Builds the reference code for a report generated on `date`.
pub fn generate_ref_code(owner_id: &str, session_count: usize, region_code: Option<&str>, date: NaiveDate) -> String {
    let region = region_code.map(str::trim).filter(|r| !r.is_empty()).unwrap_or(DEFAULT_REGION_CODE);

    let stripped: Vec<char> = owner_id.chars().filter(|c| *c != '-').collect();
    let user_part: String = stripped[stripped.len().saturating_sub(4)..].iter().collect::<String>().to_uppercase();

    let date_part = format!("{:02}{:02}", date.month(), date.day());
    let sessions_part = format!("{:02}", session_count.min(MAX_SESSIONS));

    format!("{}-{}-{}-{}", region, user_part, date_part, sessions_part)
}
