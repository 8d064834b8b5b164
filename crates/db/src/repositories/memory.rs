use tokio::sync::RwLock;

use ecosim_core::domain::activity::{EnergyReading, MobilityTrip};
use ecosim_core::domain::record::{CanonicalRecord, RecordDocument};

use super::{EnergyReadingRepository, MobilityTripRepository, RecordRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryRecordRepository {
    documents: RwLock<Vec<RecordDocument>>,
}

impl InMemoryRecordRepository {
    /// Seeds a raw document, including legacy ones without a total.
    pub async fn push_document(&self, document: RecordDocument) {
        self.documents.write().await.push(document);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn find_latest(&self) -> Result<Option<RecordDocument>, RepositoryError> {
        let documents = self.documents.read().await;
        // later insertion wins on equal timestamps, matching the SQL ordering
        let latest = documents
            .iter()
            .enumerate()
            .max_by(|(left_index, left), (right_index, right)| {
                left.generated_at.cmp(&right.generated_at).then(left_index.cmp(right_index))
            })
            .map(|(_, document)| document.clone());
        Ok(latest)
    }

    async fn insert(&self, record: CanonicalRecord) -> Result<CanonicalRecord, RepositoryError> {
        self.documents.write().await.push(RecordDocument::from(record.clone()));
        Ok(record)
    }
}

#[derive(Default)]
pub struct InMemoryEnergyReadingRepository {
    readings: RwLock<Vec<EnergyReading>>,
}

#[async_trait::async_trait]
impl EnergyReadingRepository for InMemoryEnergyReadingRepository {
    async fn insert(&self, reading: EnergyReading) -> Result<EnergyReading, RepositoryError> {
        self.readings.write().await.push(reading.clone());
        Ok(reading)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<EnergyReading>, RepositoryError> {
        let readings = self.readings.read().await;
        let mut ordered: Vec<(usize, &EnergyReading)> = readings.iter().enumerate().collect();
        ordered.sort_by(|(left_index, left), (right_index, right)| {
            right.recorded_at.cmp(&left.recorded_at).then(right_index.cmp(left_index))
        });
        Ok(ordered.into_iter().take(limit as usize).map(|(_, reading)| reading.clone()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryMobilityTripRepository {
    trips: RwLock<Vec<MobilityTrip>>,
}

#[async_trait::async_trait]
impl MobilityTripRepository for InMemoryMobilityTripRepository {
    async fn insert(&self, trip: MobilityTrip) -> Result<MobilityTrip, RepositoryError> {
        self.trips.write().await.push(trip.clone());
        Ok(trip)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<MobilityTrip>, RepositoryError> {
        let trips = self.trips.read().await;
        let mut ordered: Vec<(usize, &MobilityTrip)> = trips.iter().enumerate().collect();
        ordered.sort_by(|(left_index, left), (right_index, right)| {
            right.recorded_at.cmp(&left.recorded_at).then(right_index.cmp(left_index))
        });
        Ok(ordered.into_iter().take(limit as usize).map(|(_, trip)| trip.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use ecosim_core::domain::record::{
        CanonicalRecord, Period, RecordBreakdown, RecordDocument, RecordId, RecordOrigin,
    };

    use crate::repositories::{InMemoryRecordRepository, RecordRepository};

    #[tokio::test]
    async fn in_memory_latest_matches_sql_ordering() {
        let repo = InMemoryRecordRepository::default();
        let now = Utc::now();

        let newest = CanonicalRecord::synthesized_default(now);
        repo.insert(CanonicalRecord::synthesized_default(now - Duration::hours(1)))
            .await
            .expect("insert older");
        repo.insert(newest.clone()).await.expect("insert newest");
        let twin = CanonicalRecord::synthesized_default(now);
        repo.insert(twin.clone()).await.expect("insert twin");

        let latest = repo.find_latest().await.expect("find").expect("document");
        assert_eq!(latest.id, twin.id);
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn legacy_documents_are_kept_verbatim() {
        let repo = InMemoryRecordRepository::default();
        repo.push_document(RecordDocument {
            id: RecordId("REC-legacy".to_string()),
            generated_at: Utc::now(),
            period: Period::Monthly,
            total: None,
            breakdown: RecordBreakdown::default(),
            score: 0.0,
            origin: RecordOrigin::Submitted,
        })
        .await;

        let latest = repo.find_latest().await.expect("find").expect("document");
        assert!(latest.into_canonical().is_none());
    }
}
