//! # OnSite Timekeeper
//!
//! Time tracking core for construction crews: job sites with a geofence,
//! entry/exit sessions with breaks, plain-text hour reports that can be
//! shared as-is, and QR-code links that let a manager read a worker's
//! timesheet.
//!
//! ## Layout
//!
//! - [`libs`]: domain logic with no storage attached (durations, report
//!   text, the access-grant state machine, timesheet assembly)
//! - [`db`]: SQLite stores implementing the `libs` storage traits
//! - [`commands`]: the `onsite` command-line interface
//!
//! ## Usage
//!
//! ```rust,no_run
//! use onsite_timekeeper::commands::Cli;
//!
//! fn main() -> anyhow::Result<()> {
//!     Cli::menu()
//! }
//! ```

pub mod commands;
pub mod db;
pub mod libs;
