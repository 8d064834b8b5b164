use async_trait::async_trait;
use thiserror::Error;

use ecosim_core::domain::activity::{EnergyReading, MobilityTrip};
use ecosim_core::domain::record::{CanonicalRecord, RecordDocument};
use ecosim_core::errors::ApplicationError;

pub mod activity;
pub mod memory;
pub mod record;

pub use activity::{SqlEnergyReadingRepository, SqlMobilityTripRepository};
pub use memory::{
    InMemoryEnergyReadingRepository, InMemoryMobilityTripRepository, InMemoryRecordRepository,
};
pub use record::SqlRecordRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Append-only store of canonical records.
///
/// Records are written whole and never updated or deleted. "Latest" is the
/// most recent by `generated_at`, ties broken by insertion order.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// The most recent stored document, valid or not. Callers decide whether
    /// a document without a usable total counts as present.
    async fn find_latest(&self) -> Result<Option<RecordDocument>, RepositoryError>;
    async fn insert(&self, record: CanonicalRecord) -> Result<CanonicalRecord, RepositoryError>;
}

#[async_trait]
pub trait EnergyReadingRepository: Send + Sync {
    async fn insert(&self, reading: EnergyReading) -> Result<EnergyReading, RepositoryError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<EnergyReading>, RepositoryError>;
}

#[async_trait]
pub trait MobilityTripRepository: Send + Sync {
    async fn insert(&self, trip: MobilityTrip) -> Result<MobilityTrip, RepositoryError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<MobilityTrip>, RepositoryError>;
}
