use chrono::Utc;
use ecosim_core::domain::record::CanonicalRecord;
use ecosim_db::{connect_with_settings, migrations, seed_default_record, SeedOutcome, SqlRecordRepository};

use crate::commands::{load_config, runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let outcome = seed_default_record(&SqlRecordRepository::new(pool.clone()), Utc::now())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8));

        pool.close().await;
        outcome
    });

    match result {
        Ok(outcome) => CommandResult::success("seed", describe(&outcome)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn describe(outcome: &SeedOutcome) -> String {
    match outcome {
        SeedOutcome::Created(record) => format!("created default record {}", summary(record)),
        SeedOutcome::AlreadyPresent(record) => {
            format!("record already present, nothing to do: {}", summary(record))
        }
    }
}

fn summary(record: &CanonicalRecord) -> String {
    format!(
        "{} (total {}, score {}, period {})",
        record.id,
        record.total,
        record.score,
        record.period.as_str()
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ecosim_core::domain::record::CanonicalRecord;
    use ecosim_db::SeedOutcome;

    use super::describe;

    #[test]
    fn created_and_present_outcomes_are_distinguishable() {
        let record = CanonicalRecord::synthesized_default(Utc::now());

        let created = describe(&SeedOutcome::Created(record.clone()));
        let present = describe(&SeedOutcome::AlreadyPresent(record.clone()));

        assert!(created.starts_with("created default record REC-"));
        assert!(created.contains("total 4500, score 65, period monthly"));
        assert!(present.starts_with("record already present"));
        assert!(present.contains(&record.id.to_string()));
    }
}
