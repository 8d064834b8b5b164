//! Raw activity logged by users: metered energy readings and commute trips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::scenario::TransportMode;
use crate::errors::DomainError;

pub const DEFAULT_ENERGY_SOURCE: &str = "Grid";
pub const DEFAULT_ENERGY_REGION: &str = "City Center";
/// How many readings the energy feed returns.
pub const RECENT_READINGS_LIMIT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyReading {
    pub id: String,
    pub sector: String,
    pub load_type: String,
    pub consumption: f64,
    pub source: String,
    pub region: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewEnergyReading {
    pub sector: String,
    #[serde(alias = "loadType")]
    pub load_type: String,
    pub consumption: f64,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl NewEnergyReading {
    pub fn into_reading(self, now: DateTime<Utc>) -> Result<EnergyReading, DomainError> {
        let sector = required_text("sector", self.sector)?;
        let load_type = required_text("load_type", self.load_type)?;
        if !self.consumption.is_finite() || self.consumption < 0.0 {
            return Err(DomainError::Validation(
                "consumption must be a finite, non-negative number".to_string(),
            ));
        }

        Ok(EnergyReading {
            id: format!("ENR-{}", Uuid::new_v4()),
            sector,
            load_type,
            consumption: self.consumption,
            source: optional_text(self.source).unwrap_or_else(|| DEFAULT_ENERGY_SOURCE.to_string()),
            region: optional_text(self.region).unwrap_or_else(|| DEFAULT_ENERGY_REGION.to_string()),
            recorded_at: now,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MobilityTrip {
    pub id: String,
    pub user_id: String,
    pub start_location: String,
    pub end_location: String,
    pub transport_mode: TransportMode,
    pub distance_km: f64,
    pub carbon_kg: f64,
    pub duration_minutes: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewMobilityTrip {
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(alias = "startLocation")]
    pub start_location: String,
    #[serde(alias = "endLocation")]
    pub end_location: String,
    #[serde(alias = "transportMode")]
    pub transport_mode: TransportMode,
    #[serde(alias = "distanceKm")]
    pub distance_km: f64,
    #[serde(alias = "carbonEmitted")]
    pub carbon_kg: f64,
    #[serde(default, alias = "durationMinutes")]
    pub duration_minutes: Option<f64>,
}

impl NewMobilityTrip {
    pub fn into_trip(self, now: DateTime<Utc>) -> Result<MobilityTrip, DomainError> {
        let user_id = required_text("user_id", self.user_id)?;
        let start_location = required_text("start_location", self.start_location)?;
        let end_location = required_text("end_location", self.end_location)?;
        for (field, value) in [("distance_km", self.distance_km), ("carbon_kg", self.carbon_kg)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::Validation(format!(
                    "{field} must be a finite, non-negative number"
                )));
            }
        }
        if let Some(minutes) = self.duration_minutes {
            if !minutes.is_finite() || minutes < 0.0 {
                return Err(DomainError::Validation(
                    "duration_minutes must be a finite, non-negative number".to_string(),
                ));
            }
        }

        Ok(MobilityTrip {
            id: format!("TRIP-{}", Uuid::new_v4()),
            user_id,
            start_location,
            end_location,
            transport_mode: self.transport_mode,
            distance_km: self.distance_km,
            carbon_kg: self.carbon_kg,
            duration_minutes: self.duration_minutes,
            recorded_at: now,
        })
    }
}

fn required_text(field: &str, value: String) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    #[test]
    fn reading_defaults_source_and_region() {
        let reading: NewEnergyReading = serde_json::from_value(json!({
            "sector": "Residential",
            "loadType": "HVAC",
            "consumption": 42.5
        }))
        .expect("deserialize");

        let reading = reading.into_reading(Utc::now()).expect("valid reading");
        assert_eq!(reading.source, "Grid");
        assert_eq!(reading.region, "City Center");
        assert!(reading.id.starts_with("ENR-"));
    }

    #[test]
    fn reading_rejects_negative_consumption() {
        let reading = NewEnergyReading {
            sector: "Industrial".to_string(),
            load_type: "Machinery".to_string(),
            consumption: -1.0,
            source: None,
            region: None,
        };
        assert!(matches!(reading.into_reading(Utc::now()), Err(DomainError::Validation(_))));
    }

    #[test]
    fn trip_accepts_camel_case_fields() {
        let trip: NewMobilityTrip = serde_json::from_value(json!({
            "userId": "user-7",
            "startLocation": "Central Station",
            "endLocation": "Tech Park",
            "transportMode": "metro",
            "distanceKm": 12.0,
            "carbonEmitted": 0.2,
            "durationMinutes": 25
        }))
        .expect("deserialize");

        let trip = trip.into_trip(Utc::now()).expect("valid trip");
        assert_eq!(trip.transport_mode, TransportMode::Metro);
        assert_eq!(trip.duration_minutes, Some(25.0));
    }

    #[test]
    fn trip_requires_user() {
        let trip = NewMobilityTrip {
            user_id: "  ".to_string(),
            start_location: "A".to_string(),
            end_location: "B".to_string(),
            transport_mode: TransportMode::Bus,
            distance_km: 3.0,
            carbon_kg: 0.3,
            duration_minutes: None,
        };
        let error = trip.into_trip(Utc::now()).expect_err("missing user");
        assert_eq!(error, DomainError::Validation("user_id is required".to_string()));
    }
}
