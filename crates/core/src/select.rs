//! Best-option selection over a completed comparison.

use crate::domain::comparison::{BestOption, ComparisonSet};

/// Picks the alternative with the largest strictly positive saving against
/// the baseline.
///
/// Alternatives are visited in declared order and only a strictly larger
/// saving replaces the current pick, so ties resolve to the earliest declared
/// alternative no matter in which order the computations finished. Returns
/// `None` when the baseline itself failed or nothing beats it.
pub fn select_best(set: &ComparisonSet) -> Option<BestOption> {
    let baseline = set.baseline()?;

    let mut best: Option<BestOption> = None;
    for entry in &set.results {
        if entry.alternative_id == set.baseline_id {
            continue;
        }
        let Some(candidate) = entry.outcome.result() else {
            continue;
        };

        let savings = baseline.total - candidate.total;
        if savings <= 0.0 || !savings.is_finite() {
            continue;
        }
        if best.as_ref().is_some_and(|current| savings <= current.savings) {
            continue;
        }

        let savings_ratio = if baseline.total > 0.0 { savings / baseline.total } else { 0.0 };
        best = Some(BestOption {
            alternative_id: entry.alternative_id.clone(),
            savings,
            savings_ratio,
        });
    }
    best
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::comparison::{AlternativeOutcome, ComparisonEntry, FailureKind};
    use crate::domain::scenario::{AlternativeId, BreakdownEntry, ResultDetails, ScenarioResult};

    fn computed(id: &str, total: f64) -> ComparisonEntry {
        ComparisonEntry {
            alternative_id: AlternativeId::new(id),
            outcome: AlternativeOutcome::Computed {
                result: ScenarioResult {
                    alternative_id: AlternativeId::new(id),
                    total,
                    breakdown: vec![BreakdownEntry::new("Emissions", total)],
                    unit: "kg CO2".to_string(),
                    details: ResultDetails::Mobility {
                        time_minutes: None,
                        cost: None,
                        distance_km: None,
                        saved_vs_car: None,
                    },
                },
            },
        }
    }

    fn failed(id: &str) -> ComparisonEntry {
        ComparisonEntry {
            alternative_id: AlternativeId::new(id),
            outcome: AlternativeOutcome::NotAvailable { reason: FailureKind::ComputationFailed },
        }
    }

    fn set(entries: Vec<ComparisonEntry>) -> ComparisonSet {
        ComparisonSet::new(AlternativeId::new("car"), entries).expect("valid set")
    }

    #[test]
    fn lowest_emitter_wins_commute_comparison() {
        let best = select_best(&set(vec![
            computed("car", 3.2),
            computed("ev", 0.8),
            computed("metro", 0.2),
            computed("bus", 0.4),
        ]))
        .expect("a better option");

        assert_eq!(best.alternative_id, AlternativeId::new("metro"));
        assert!((best.savings - 3.0).abs() < 1e-9);
        assert!((best.savings_ratio - 0.9375).abs() < 1e-9);
    }

    #[test]
    fn failed_alternative_is_skipped() {
        let best = select_best(&set(vec![
            computed("car", 3.2),
            failed("metro"),
            computed("bus", 0.4),
        ]))
        .expect("a better option");
        assert_eq!(best.alternative_id, AlternativeId::new("bus"));
    }

    #[test]
    fn failed_baseline_yields_nothing() {
        assert_eq!(select_best(&set(vec![failed("car"), computed("ev", 0.8)])), None);
    }

    #[test]
    fn no_positive_saving_yields_nothing() {
        assert_eq!(select_best(&set(vec![computed("car", 1.0), computed("suv", 2.5)])), None);
        assert_eq!(select_best(&set(vec![computed("car", 1.0), computed("twin", 1.0)])), None);
    }

    #[test]
    fn ties_resolve_to_earliest_declared() {
        let best = select_best(&set(vec![
            computed("bus", 0.4),
            computed("car", 3.2),
            computed("ev", 0.4),
        ]))
        .expect("a better option");
        assert_eq!(best.alternative_id, AlternativeId::new("bus"));
    }

    proptest! {
        #[test]
        fn result_depends_only_on_declared_order_and_values(
            baseline in 0.0f64..10.0,
            totals in proptest::collection::vec(0.0f64..10.0, 1..6),
        ) {
            let mut entries = vec![computed("car", baseline)];
            for (index, total) in totals.iter().enumerate() {
                entries.push(computed(&format!("alt-{index}"), *total));
            }
            let best = select_best(&set(entries));

            let expected = totals
                .iter()
                .enumerate()
                .filter(|(_, total)| baseline - **total > 0.0)
                .fold(None::<(usize, f64)>, |acc, (index, total)| match acc {
                    Some((_, saving)) if baseline - *total <= saving => acc,
                    _ => Some((index, baseline - *total)),
                });

            match expected {
                Some((index, saving)) => {
                    let best = best.expect("selection");
                    prop_assert_eq!(best.alternative_id, AlternativeId::new(format!("alt-{index}")));
                    prop_assert!((best.savings - saving).abs() < 1e-12);
                }
                None => prop_assert!(best.is_none()),
            }
        }
    }
}
