use crate::{
    commands::load_identity,
    db::locations::Locations,
    libs::{
        error::TimekeeperError,
        location::{LocationStore, NewLocation},
        messages::Message,
        view::View,
    },
    msg_info, msg_print, msg_success,
};
use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct LocationArgs {
    #[command(subcommand)]
    command: LocationCommand,
}

#[derive(Debug, Subcommand)]
enum LocationCommand {
    /// Add a geofenced job site
    Add {
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, help = "Geofence radius in meters [default: 100]")]
        radius: Option<f64>,
        #[arg(long)]
        color: Option<String>,
    },
    /// List active locations
    List,
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
    },
}

pub fn cmd(args: LocationArgs) -> Result<()> {
    let (_, user) = load_identity()?;
    let mut locations = Locations::new()?;

    match args.command {
        LocationCommand::Add {
            name,
            lat,
            lon,
            radius,
            color,
        } => {
            let location = NewLocation {
                name,
                latitude: lat,
                longitude: lon,
                radius,
                color,
            }
            .into_location(&user.id, Utc::now())?;
            locations.insert(&location)?;
            msg_success!(Message::LocationCreated(location.name, location.id));
        }
        LocationCommand::List => {
            let active = locations.list_active(&user.id)?;
            if active.is_empty() {
                msg_info!(Message::LocationsNotFound);
                return Ok(());
            }
            msg_print!(Message::LocationsHeader, true);
            View::locations(&active);
        }
        LocationCommand::Rename { id, name } => {
            ensure_owned(&mut locations, &id, &user.id)?;
            locations.rename(&id, &name, Utc::now())?;
            msg_success!(Message::LocationRenamed(name.trim().to_string()));
        }
        LocationCommand::Delete { id } => {
            ensure_owned(&mut locations, &id, &user.id)?;
            locations.soft_delete(&id, Utc::now())?;
            msg_success!(Message::LocationDeleted(id));
        }
    }
    Ok(())
}

fn ensure_owned(locations: &mut Locations, id: &str, owner_id: &str) -> Result<()> {
    match locations.get(id)? {
        Some(location) if location.owner_id == owner_id && location.is_active() => Ok(()),
        _ => Err(TimekeeperError::not_found("Location not found").into()),
    }
}
