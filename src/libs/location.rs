//! Geofenced job sites.

use crate::libs::error::{Result, TimekeeperError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LOCATION_COLOR: &str = "#4A90D9";
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Active,
    Deleted,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationStatus::Active => "active",
            LocationStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationStatus {
    type Err = TimekeeperError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(LocationStatus::Active),
            "deleted" => Ok(LocationStatus::Deleted),
            other => Err(TimekeeperError::validation(format!("Unknown location status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters.
    pub radius: f64,
    pub color: String,
    pub status: LocationStatus,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn is_active(&self) -> bool {
        self.status == LocationStatus::Active
    }
}

/// Input for creating a location.
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: Option<f64>,
    pub color: Option<String>,
}

impl NewLocation {
    /// Checks the input and builds the record owned by `owner_id`.
    pub fn into_location(self, owner_id: &str, now: DateTime<Utc>) -> Result<Location> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TimekeeperError::validation("Location name is required"));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TimekeeperError::validation("Latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TimekeeperError::validation("Longitude must be between -180 and 180"));
        }
        let radius = self.radius.unwrap_or(DEFAULT_RADIUS_METERS);
        if !(radius.is_finite() && radius > 0.0) {
            return Err(TimekeeperError::validation("Radius must be greater than 0"));
        }

        Ok(Location {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            radius,
            color: self.color.filter(|c| !c.trim().is_empty()).unwrap_or_else(|| DEFAULT_LOCATION_COLOR.to_string()),
            status: LocationStatus::Active,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Storage contract for locations.
pub trait LocationStore {
    fn insert(&mut self, location: &Location) -> Result<()>;

    fn get(&mut self, id: &str) -> Result<Option<Location>>;

    /// Active locations of `owner_id` ordered by name.
    fn list_active(&mut self, owner_id: &str) -> Result<Vec<Location>>;

    fn rename(&mut self, id: &str, name: &str, at: DateTime<Utc>) -> Result<()>;

    /// Flags the location deleted; sessions keep their copy of its name.
    fn soft_delete(&mut self, id: &str, at: DateTime<Utc>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewLocation {
        NewLocation {
            name: " Harbour Tower ".to_string(),
            latitude: 45.5,
            longitude: -73.56,
            radius: None,
            color: None,
        }
    }

    #[test]
    fn test_defaults_applied() {
        let location = input().into_location("worker-1", Utc::now()).unwrap();
        assert_eq!(location.name, "Harbour Tower");
        assert_eq!(location.radius, DEFAULT_RADIUS_METERS);
        assert_eq!(location.color, DEFAULT_LOCATION_COLOR);
        assert!(location.is_active());
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let mut bad_lat = input();
        bad_lat.latitude = 91.0;
        assert!(bad_lat.into_location("w", Utc::now()).is_err());

        let mut bad_lon = input();
        bad_lon.longitude = -180.5;
        assert!(bad_lon.into_location("w", Utc::now()).is_err());

        let mut bad_radius = input();
        bad_radius.radius = Some(0.0);
        assert!(bad_radius.into_location("w", Utc::now()).is_err());

        let mut no_name = input();
        no_name.name = "   ".to_string();
        assert!(matches!(no_name.into_location("w", Utc::now()), Err(TimekeeperError::Validation(_))));
    }
}
