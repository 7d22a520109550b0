//! Deterministic renovation cost model.
//!
//! Pure table-driven pricing used both as context for the AI estimator and as
//! the guaranteed fallback when the provider is unreachable. No I/O, no
//! failure modes beyond defaulting on unrecognized keys.

use crate::models::quote::CostEstimate;

/// Square footage assumed when the client omits the field or sends something
/// unparseable.
const DEFAULT_SQUARE_FOOTAGE: f64 = 500.0;

/// `{min, max, cost per sq ft}` for a project type. Unknown types fall back
/// to the "other" row.
fn base_costs(project_type: &str) -> (f64, f64, f64) {
    match project_type {
        "kitchen" => (15_000.0, 75_000.0, 150.0),
        "bathroom" => (8_000.0, 35_000.0, 200.0),
        "full-home" => (50_000.0, 200_000.0, 100.0),
        "basement" => (20_000.0, 80_000.0, 80.0),
        "office" => (25_000.0, 100_000.0, 120.0),
        _ => (10_000.0, 50_000.0, 100.0),
    }
}

fn borough_factor(borough: &str) -> f64 {
    match borough {
        "manhattan" => 1.3,
        "brooklyn" => 1.1,
        "queens" => 1.0,
        "bronx" => 0.9,
        "staten-island" => 0.9,
        _ => 1.0,
    }
}

fn budget_factor(budget_tier: &str) -> f64 {
    match budget_tier {
        "under-10k" => 0.8,
        "10k-25k" => 1.0,
        "25k-50k" => 1.2,
        "50k-100k" => 1.5,
        "100k-plus" => 2.0,
        _ => 1.0,
    }
}

/// Rounds to the nearest 1000, halves away from zero (JS `Math.round`
/// semantics for the non-negative values this model produces).
pub fn round_to_thousand(value: f64) -> i64 {
    ((value / 1000.0).round() * 1000.0) as i64
}

/// Leading-integer parse of a free-form square footage field ("750", "750 sq
/// ft", "  750ish").
fn parse_square_footage(raw: &str) -> Option<f64> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<f64>().ok()
}

/// Computes the deterministic price range for a project.
///
/// `base = per_sqft * sqft`, lower bound `max(type_min, base * 0.6)` scaled by
/// the borough factor, upper bound `min(type_max, base * 1.8)` scaled by
/// borough and budget factors. The pair is ordered before returning so
/// `min <= max` holds even where the table bounds and the area-derived bounds
/// cross (e.g. a very large bathroom).
pub fn estimate(
    project_type: Option<&str>,
    square_footage: Option<&str>,
    borough: Option<&str>,
    budget_tier: Option<&str>,
) -> CostEstimate {
    let project_type = project_type.unwrap_or("other");
    let (type_min, type_max, per_sqft) = base_costs(project_type);

    let sqft = square_footage
        .and_then(parse_square_footage)
        .unwrap_or(DEFAULT_SQUARE_FOOTAGE);
    let borough_mult = borough.map(borough_factor).unwrap_or(1.0);
    let budget_mult = budget_tier.map(budget_factor).unwrap_or(1.0);

    let base = per_sqft * sqft;
    let lower = type_min.max(base * 0.6) * borough_mult;
    let upper = type_max.min(base * 1.8) * borough_mult * budget_mult;

    let (min, max) = if lower <= upper {
        (round_to_thousand(lower), round_to_thousand(upper))
    } else {
        (round_to_thousand(upper), round_to_thousand(lower))
    };

    CostEstimate {
        min,
        max,
        reasoning: format!(
            "Based on {} renovation in {} ({} sq ft)",
            project_type,
            borough.unwrap_or("NYC"),
            sqft as i64
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn rounds_to_nearest_thousand() {
        assert_eq!(round_to_thousand(22_500.0), 23_000);
        assert_eq!(round_to_thousand(48_250.0), 48_000);
        assert_eq!(round_to_thousand(999.0), 1_000);
        assert_eq!(round_to_thousand(0.0), 0);
    }

    #[test]
    fn kitchen_in_manhattan_uses_borough_factor() {
        let est = estimate(Some("kitchen"), Some("500"), Some("manhattan"), Some("10k-25k"));
        // base 75_000: min = max(15_000, 45_000) * 1.3 = 58_500 -> 59_000
        // max = min(75_000, 135_000) * 1.3 = 97_500 -> 98_000
        assert_eq!(est.min, 59_000);
        assert_eq!(est.max, 98_000);
    }

    #[test]
    fn unknown_project_type_falls_back_to_other() {
        let est = estimate(Some("garage"), Some("500"), Some("queens"), None);
        // other row: base 50_000, min = max(10_000, 30_000), max = min(50_000, 90_000)
        assert_eq!(est.min, 30_000);
        assert_eq!(est.max, 50_000);
    }

    #[test]
    fn missing_attributes_use_defaults() {
        let est = estimate(None, None, None, None);
        let explicit = estimate(Some("other"), Some("500"), None, None);
        assert_eq!(est.min, explicit.min);
        assert_eq!(est.max, explicit.max);
        assert!(est.reasoning.contains("NYC"));
    }

    #[test]
    fn unparseable_square_footage_defaults() {
        let est = estimate(Some("kitchen"), Some("a lot"), None, None);
        let default = estimate(Some("kitchen"), Some("500"), None, None);
        assert_eq!(est.min, default.min);
        assert_eq!(est.max, default.max);
    }

    #[test]
    fn bounds_are_ordered_when_table_and_area_cross() {
        // 500 sq ft bathroom: area-derived lower bound (60_000) exceeds the
        // budget-scaled table ceiling (28_000); the pair must come back ordered.
        let est = estimate(Some("bathroom"), Some("500"), Some("queens"), Some("under-10k"));
        assert!(est.min <= est.max);
        assert_eq!(est.min, 28_000);
        assert_eq!(est.max, 60_000);
    }

    proptest! {
        #[test]
        fn bounds_are_nonnegative_ordered_multiples_of_1000(
            project_type in prop::sample::select(vec![
                "kitchen", "bathroom", "full-home", "basement", "office", "other", "garage",
            ]),
            borough in prop::sample::select(vec![
                "manhattan", "brooklyn", "queens", "bronx", "staten-island", "elsewhere",
            ]),
            budget in prop::sample::select(vec![
                "under-10k", "10k-25k", "25k-50k", "50k-100k", "100k-plus", "unknown",
            ]),
            sqft in 0u32..20_000,
        ) {
            let sqft_text = sqft.to_string();
            let est = estimate(Some(project_type), Some(&sqft_text), Some(borough), Some(budget));
            prop_assert!(est.min >= 0);
            prop_assert!(est.min <= est.max);
            prop_assert_eq!(est.min % 1000, 0);
            prop_assert_eq!(est.max % 1000, 0);
        }
    }
}
