//! Core library modules of the timekeeper.
//!
//! ## Features
//!
//! - **Time arithmetic**: [`duration`] turns entry/exit pairs into minutes and labels
//! - **Reports**: [`report`] renders daily and multi-day text, [`ref_code`] stamps them
//! - **Sharing**: [`grant`] runs the token and access-grant lifecycle
//! - **Records**: [`session`], [`location`], [`tracking`] and [`archive`]
//! - **Assembly**: [`timesheet`] loads authorized sessions and builds reports
//! - **Infrastructure**: configuration, data storage, messages, tables, export
//!
//! ## Usage
//!
//! ```rust,no_run
//! use onsite_timekeeper::db::db::Db;
//! use onsite_timekeeper::db::grants::Grants;
//! use onsite_timekeeper::libs::grant::{AccessManager, AccessPolicy};
//!
//! let mut access = AccessManager::new(Grants::with_db(Db::new()?), AccessPolicy::default());
//! let token = access.generate_token("worker-1", "Alex Martin")?;
//! println!("{}", token.token);
//! # Ok::<(), onsite_timekeeper::libs::error::TimekeeperError>(())
//! ```

pub mod archive;
pub mod config;
pub mod data_storage;
pub mod duration;
pub mod error;
pub mod export;
pub mod grant;
pub mod location;
pub mod messages;
pub mod ref_code;
pub mod report;
pub mod session;
pub mod timesheet;
pub mod tracking;
pub mod view;
