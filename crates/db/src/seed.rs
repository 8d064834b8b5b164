use chrono::{DateTime, Duration, Utc};

use ecosim_core::domain::record::CanonicalRecord;

use crate::repositories::{RecordRepository, RepositoryError};

#[derive(Clone, Debug, PartialEq)]
pub enum SeedOutcome {
    Created(CanonicalRecord),
    AlreadyPresent(CanonicalRecord),
}

impl SeedOutcome {
    pub fn record(&self) -> &CanonicalRecord {
        match self {
            Self::Created(record) | Self::AlreadyPresent(record) => record,
        }
    }

    pub fn created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Persists the default record unless a usable record already exists.
///
/// A latest document without a usable total counts as absent, so a store
/// holding only legacy documents gets a fresh default on top of them. The
/// default is stamped after that document so it becomes the latest one, even
/// when the legacy timestamp lies in the future.
pub async fn seed_default_record(
    repository: &dyn RecordRepository,
    now: DateTime<Utc>,
) -> Result<SeedOutcome, RepositoryError> {
    let generated_at = match repository.find_latest().await? {
        Some(document) => {
            let unusable_at = document.generated_at;
            if let Some(existing) = document.into_canonical() {
                return Ok(SeedOutcome::AlreadyPresent(existing));
            }
            now.max(unusable_at + Duration::milliseconds(1))
        }
        None => now,
    };

    let created = repository.insert(CanonicalRecord::synthesized_default(generated_at)).await?;
    Ok(SeedOutcome::Created(created))
}
