use ecosim_core::domain::scenario::Domain;
use ecosim_core::domain::suggestion::{Impact, Suggestion};

/// Bumped whenever the fixed suggestion content below changes.
pub const FALLBACK_CATALOG_VERSION: u32 = 1;

pub fn fallback_suggestions(domain: Domain) -> Vec<Suggestion> {
    match domain {
        Domain::Carbon => vec![
            Suggestion::new(
                "Switch to EV commuting",
                "Replacing petrol car trips with an electric vehicle cuts transport emissions the most.",
                Impact::High,
                Some("1.2t"),
            ),
            Suggestion::new(
                "Optimize HVAC Schedule",
                "Align heating and cooling with occupied hours instead of running them all day.",
                Impact::Medium,
                Some("0.5t"),
            ),
            Suggestion::new(
                "Reduce Plastic Consumption",
                "Prefer reusable containers and bulk purchases over single-use packaging.",
                Impact::Low,
                Some("0.1t"),
            ),
        ],
        Domain::Mobility => vec![
            Suggestion::new(
                "Take the metro for regular commutes",
                "Rail transit emits a fraction of a private car per passenger kilometre.",
                Impact::High,
                Some("3.0 kg CO2 per trip"),
            ),
            Suggestion::new(
                "Combine errands into one trip",
                "Chaining stops avoids cold starts and repeated short journeys.",
                Impact::Medium,
                Some("0.8 kg CO2 per week"),
            ),
            Suggestion::new(
                "Cycle or walk short distances",
                "Trips under three kilometres are often faster without a car.",
                Impact::Low,
                None,
            ),
        ],
        Domain::Energy => vec![
            Suggestion::new(
                "Shift heavy loads off peak",
                "Run flexible equipment outside the afternoon peak to flatten demand.",
                Impact::High,
                Some("15%"),
            ),
            Suggestion::new(
                "Enable lighting optimization",
                "Dim or switch off lighting in unoccupied zones with schedules or sensors.",
                Impact::Medium,
                Some("12%"),
            ),
            Suggestion::new(
                "Reduce HVAC usage",
                "Widen the thermostat dead band and service filters regularly.",
                Impact::Medium,
                Some("8%"),
            ),
        ],
    }
}
