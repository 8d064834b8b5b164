pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod seed;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    EnergyReadingRepository, InMemoryEnergyReadingRepository, InMemoryMobilityTripRepository,
    InMemoryRecordRepository, MobilityTripRepository, RecordRepository, RepositoryError,
    SqlEnergyReadingRepository, SqlMobilityTripRepository, SqlRecordRepository,
};
pub use seed::{seed_default_record, SeedOutcome};
