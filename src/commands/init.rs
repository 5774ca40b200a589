use crate::{
    libs::{
        config::{normalize_region, Config, CONFIG_FILE_NAME},
        data_storage::DataStorage,
        messages::Message,
    },
    msg_bail_anyhow, msg_success,
};
use anyhow::Result;
use chrono_tz::Tz;
use clap::Args;

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(long, help = "User id (generated when omitted)")]
    id: Option<String>,
    #[arg(long, help = "Display name printed on reports")]
    name: Option<String>,
    #[arg(long, help = "IANA time zone, e.g. America/Toronto")]
    time_zone: Option<String>,
    #[arg(long, help = "Region code for report references, e.g. QC")]
    region: Option<String>,
    #[arg(long, help = "Require approval before links become active")]
    require_approval: Option<bool>,
}

impl InitArgs {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.time_zone.is_none() && self.region.is_none() && self.require_approval.is_none()
    }
}

/// Interactive wizard without flags, otherwise applies the flags to the current file.
pub fn cmd(args: InitArgs) -> Result<()> {
    let config = if args.is_empty() { Config::init()? } else { apply(Config::read()?, args)? };
    config.save()?;

    let path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
    msg_success!(Message::ConfigSaved(path.display().to_string()));
    Ok(())
}

fn apply(mut config: Config, args: InitArgs) -> Result<Config> {
    if let Some(id) = args.id {
        config.user.id = id.trim().to_string();
    }
    if config.user.id.is_empty() {
        config.user.id = uuid::Uuid::new_v4().to_string();
    }
    if let Some(name) = args.name {
        config.user.name = name.trim().to_string();
    }
    if let Some(zone) = args.time_zone {
        config.report.time_zone = match zone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => msg_bail_anyhow!(Message::InvalidTimeZone(zone)),
        };
    }
    if let Some(region) = args.region {
        config.report.region_code = normalize_region(&region);
    }
    if let Some(require_approval) = args.require_approval {
        config.access.require_owner_approval = require_approval;
    }
    Ok(config)
}
