use sqlx::Row;

use ecosim_core::domain::activity::{EnergyReading, MobilityTrip};
use ecosim_core::domain::scenario::TransportMode;

use super::record::{decode_timestamp, encode_timestamp};
use super::{EnergyReadingRepository, MobilityTripRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEnergyReadingRepository {
    pool: DbPool,
}

impl SqlEnergyReadingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub struct SqlMobilityTripRepository {
    pool: DbPool,
}

impl SqlMobilityTripRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_reading(row: &sqlx::sqlite::SqliteRow) -> Result<EnergyReading, RepositoryError> {
    let recorded_at: String = row.try_get("recorded_at").map_err(decode_err)?;
    Ok(EnergyReading {
        id: row.try_get("id").map_err(decode_err)?,
        sector: row.try_get("sector").map_err(decode_err)?,
        load_type: row.try_get("load_type").map_err(decode_err)?,
        consumption: row.try_get("consumption").map_err(decode_err)?,
        source: row.try_get("source").map_err(decode_err)?,
        region: row.try_get("region").map_err(decode_err)?,
        recorded_at: decode_timestamp("recorded_at", &recorded_at)?,
    })
}

fn row_to_trip(row: &sqlx::sqlite::SqliteRow) -> Result<MobilityTrip, RepositoryError> {
    let mode: String = row.try_get("transport_mode").map_err(decode_err)?;
    let recorded_at: String = row.try_get("recorded_at").map_err(decode_err)?;
    Ok(MobilityTrip {
        id: row.try_get("id").map_err(decode_err)?,
        user_id: row.try_get("user_id").map_err(decode_err)?,
        start_location: row.try_get("start_location").map_err(decode_err)?,
        end_location: row.try_get("end_location").map_err(decode_err)?,
        transport_mode: TransportMode::parse(&mode)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown transport mode `{mode}`")))?,
        distance_km: row.try_get("distance_km").map_err(decode_err)?,
        carbon_kg: row.try_get("carbon_kg").map_err(decode_err)?,
        duration_minutes: row.try_get("duration_minutes").map_err(decode_err)?,
        recorded_at: decode_timestamp("recorded_at", &recorded_at)?,
    })
}

#[async_trait::async_trait]
impl EnergyReadingRepository for SqlEnergyReadingRepository {
    async fn insert(&self, reading: EnergyReading) -> Result<EnergyReading, RepositoryError> {
        sqlx::query(
            "INSERT INTO energy_reading (id, sector, load_type, consumption, source, region, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&reading.id)
        .bind(&reading.sector)
        .bind(&reading.load_type)
        .bind(reading.consumption)
        .bind(&reading.source)
        .bind(&reading.region)
        .bind(encode_timestamp(&reading.recorded_at))
        .execute(&self.pool)
        .await?;

        Ok(reading)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<EnergyReading>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, sector, load_type, consumption, source, region, recorded_at
             FROM energy_reading
             ORDER BY recorded_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reading).collect()
    }
}

#[async_trait::async_trait]
impl MobilityTripRepository for SqlMobilityTripRepository {
    async fn insert(&self, trip: MobilityTrip) -> Result<MobilityTrip, RepositoryError> {
        sqlx::query(
            "INSERT INTO mobility_trip (id, user_id, start_location, end_location, transport_mode,
                                        distance_km, carbon_kg, duration_minutes, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&trip.id)
        .bind(&trip.user_id)
        .bind(&trip.start_location)
        .bind(&trip.end_location)
        .bind(trip.transport_mode.as_str())
        .bind(trip.distance_km)
        .bind(trip.carbon_kg)
        .bind(trip.duration_minutes)
        .bind(encode_timestamp(&trip.recorded_at))
        .execute(&self.pool)
        .await?;

        Ok(trip)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<MobilityTrip>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, start_location, end_location, transport_mode, distance_km,
                    carbon_kg, duration_minutes, recorded_at
             FROM mobility_trip
             ORDER BY recorded_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_trip).collect()
    }
}
