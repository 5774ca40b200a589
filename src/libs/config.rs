//! Configuration for the timekeeper CLI.
//!
//! Settings live in `config.json` inside the [`DataStorage`] directory and
//! are grouped into sections:
//!
//! - **user**: the identity the rest of the app acts as
//! - **report**: locale, time zone and region printed into reports
//! - **access**: approval mode and token lifetime of the sharing flow
//! - **archive**: how long dismissals live and how far back pending hours look
//!
//! A missing file means defaults; a missing section means that section's
//! defaults. Unknown locales or time zone names fail loading.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use onsite_timekeeper::libs::config::Config;
//!
//! let config = Config::read()?;
//! let settings = config.report.settings();
//! println!("Reports use {}", settings.time_zone);
//! # Ok::<(), onsite_timekeeper::libs::error::TimekeeperError>(())
//! ```

use super::data_storage::DataStorage;
use crate::libs::archive::DEFAULT_EXPIRY_DAYS;
use crate::libs::error::{Result, TimekeeperError};
use crate::libs::grant::{AccessPolicy, DEFAULT_TOKEN_TTL_MINUTES};
use crate::libs::messages::Message;
use crate::libs::report::{Locale, ReportSettings};
use crate::libs::timesheet::DEFAULT_HISTORY_DAYS;
use crate::msg_print;
use chrono::Duration;
use chrono_tz::Tz;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "config.json";
/// One day.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 24 * 60;
/// Ten years.
pub const MAX_ARCHIVE_DAYS: i64 = 3650;

/// Identity supplied by whoever authenticated the user.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub locale: Locale,
    /// IANA zone name, e.g. `America/Toronto`.
    pub time_zone: Tz,
    /// Two-letter region printed at the start of reference codes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            locale: Locale::EnUs,
            time_zone: Tz::UTC,
            region_code: None,
        }
    }
}

impl ReportConfig {
    pub fn settings(&self) -> ReportSettings {
        ReportSettings {
            locale: self.locale,
            time_zone: self.time_zone,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AccessConfig {
    /// Redeemed grants wait for the owner's approval when set.
    pub require_owner_approval: bool,
    pub token_ttl_minutes: i64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            require_owner_approval: false,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }
}

impl AccessConfig {
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy {
            require_owner_approval: self.require_owner_approval,
            token_ttl: Duration::minutes(self.token_ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Days a dismissal marker survives.
    pub expiry_days: i64,
    /// Days of history the pending-hours view loads.
    pub history_days: i64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            expiry_days: DEFAULT_EXPIRY_DAYS,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub user: UserConfig,
    pub report: ReportConfig,
    pub access: AccessConfig,
    pub archive: ArchiveConfig,
}

impl Config {
    /// Reads `config.json` from the data directory.
    pub fn read() -> Result<Config> {
        let path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        Self::read_from(&path)
    }

    pub fn read_from(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let config_str = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_str).map_err(|e| TimekeeperError::Config(format!("{}: {}", path.display(), e)))?;
        config
            .validate()
            .map_err(|message| TimekeeperError::Config(format!("{}: {}", path.display(), message)))?;
        Ok(config)
    }

    /// Range checks for the numeric settings.
    pub fn validate(&self) -> std::result::Result<(), String> {
        check_range("access.token_ttl_minutes", self.access.token_ttl_minutes, MAX_TOKEN_TTL_MINUTES)?;
        check_range("archive.expiry_days", self.archive.expiry_days, MAX_ARCHIVE_DAYS)?;
        check_range("archive.history_days", self.archive.history_days, MAX_ARCHIVE_DAYS)
    }

    pub fn save(&self) -> Result<()> {
        let path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let config_file = File::create(path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    /// The configured identity, or `NotAuthenticated` when none is set.
    pub fn identity(&self) -> Result<&UserConfig> {
        if self.user.id.trim().is_empty() {
            return Err(TimekeeperError::NotAuthenticated);
        }
        Ok(&self.user)
    }

    /// Interactive setup; current values are offered as defaults.
    pub fn init() -> anyhow::Result<Self> {
        let mut config = Self::read().unwrap_or_default();
        let theme = ColorfulTheme::default();

        msg_print!(Message::ConfigSectionUser);
        let default_id = match config.user.id.trim() {
            "" => uuid::Uuid::new_v4().to_string(),
            id => id.to_string(),
        };
        config.user.id = Input::with_theme(&theme)
            .with_prompt(Message::PromptUserId.to_string())
            .default(default_id)
            .interact_text()?;
        config.user.name = Input::with_theme(&theme)
            .with_prompt(Message::PromptUserName.to_string())
            .default(config.user.name.clone())
            .allow_empty(true)
            .interact_text()?;

        msg_print!(Message::ConfigSectionReport);
        config.report.time_zone = Input::with_theme(&theme)
            .with_prompt(Message::PromptTimeZone.to_string())
            .default(config.report.time_zone.to_string())
            .validate_with(|input: &String| input.parse::<Tz>().map(|_| ()).map_err(|_| Message::InvalidTimeZone(input.clone()).to_string()))
            .interact_text()?
            .parse::<Tz>()
            .map_err(|_| anyhow::anyhow!(Message::InvalidTimeZone(String::new()).to_string()))?;
        let region: String = Input::with_theme(&theme)
            .with_prompt(Message::PromptRegionCode.to_string())
            .default(config.report.region_code.clone().unwrap_or_default())
            .allow_empty(true)
            .interact_text()?;
        config.report.region_code = normalize_region(&region);

        msg_print!(Message::ConfigSectionAccess);
        config.access.require_owner_approval = Confirm::with_theme(&theme)
            .with_prompt(Message::PromptRequireApproval.to_string())
            .default(config.access.require_owner_approval)
            .interact()?;

        Ok(config)
    }
}

fn check_range(field: &str, value: i64, max: i64) -> std::result::Result<(), String> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be between 1 and {}, got {}", field, max, value))
    }
}

/// Upper-cases a region code; blank input clears it.
pub fn normalize_region(value: &str) -> Option<String> {
    match value.trim() {
        "" => None,
        region => Some(region.to_uppercase()),
    }
}
