//! Deterministic price heuristics shared by cart assembly and the estimate
//! fallback path.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::cart::PriceRange;
use crate::domain::session::DetailValue;

/// Keyword-matched base prices in whole dollars. First match on the
/// lowercased service name wins; unmatched services fall back to
/// `DEFAULT_BASE_PRICE`.
const BASE_PRICES: &[(&str, i64)] = &[
    ("hvac", 350),
    ("heating", 350),
    ("cooling", 350),
    ("air conditioning", 350),
    ("plumb", 275),
    ("electric", 300),
    ("roof", 450),
    ("kitchen", 2500),
    ("bathroom", 1800),
    ("lawn", 120),
    ("landscap", 150),
    ("tree", 400),
];

pub const DEFAULT_BASE_PRICE: i64 = 200;

pub fn base_price(service_name: &str) -> Decimal {
    let name = service_name.to_ascii_lowercase();
    let dollars = BASE_PRICES
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, dollars)| *dollars)
        .unwrap_or(DEFAULT_BASE_PRICE);
    Decimal::new(dollars, 0)
}

/// Base price adjusted by the collected details: square footage over 1000
/// scales by 1.2, an urgency mentioning "emergency" by 1.5, and a textual
/// size of "large"/"small" by 1.2/0.8.
pub fn adjusted_price(service_name: &str, details: &BTreeMap<String, DetailValue>) -> Decimal {
    let mut price = base_price(service_name);

    if let Some(square_footage) = square_footage_of(details) {
        if square_footage > 1000 {
            price *= Decimal::new(12, 1);
        }
    }

    let urgency_is_emergency = details
        .get("urgency")
        .map(|detail| detail.value.to_ascii_lowercase().contains("emergency"))
        .unwrap_or(false);
    if urgency_is_emergency {
        price *= Decimal::new(15, 1);
    }

    match textual_size_of(details) {
        Some(TextualSize::Large) => price *= Decimal::new(12, 1),
        Some(TextualSize::Small) => price *= Decimal::new(8, 1),
        None => {}
    }

    price
}

/// Heuristic uncertainty band: [price x 0.8, price x 1.2].
pub fn heuristic_range(price: Decimal) -> PriceRange {
    PriceRange { low: price * Decimal::new(8, 1), high: price * Decimal::new(12, 1) }
}

fn square_footage_of(details: &BTreeMap<String, DetailValue>) -> Option<i64> {
    let raw = &details.get("square_footage")?.value;
    let digits: String = raw.chars().filter(|ch| ch.is_ascii_digit()).collect();
    digits.parse().ok()
}

enum TextualSize {
    Large,
    Small,
}

fn textual_size_of(details: &BTreeMap<String, DetailValue>) -> Option<TextualSize> {
    // Size-ish keys only (kitchen_size, project_size, ...) so free-form
    // descriptions don't accidentally scale the price.
    for (key, detail) in details {
        if !key.contains("size") {
            continue;
        }
        let value = detail.value.to_ascii_lowercase();
        if value.contains("large") {
            return Some(TextualSize::Large);
        }
        if value.contains("small") {
            return Some(TextualSize::Small);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::session::{DetailSource, DetailValue, SessionId};

    use super::{adjusted_price, base_price, heuristic_range, DEFAULT_BASE_PRICE};

    fn details(pairs: &[(&str, &str)]) -> BTreeMap<String, DetailValue> {
        pairs
            .iter()
            .map(|(key, value)| {
                (
                    key.to_string(),
                    DetailValue {
                        value: value.to_string(),
                        source: DetailSource::DetailGathering,
                        collected_at: Utc::now(),
                        session_id: SessionId("s-1".to_string()),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn unknown_services_use_the_default_base() {
        assert_eq!(base_price("Gutter Cleaning"), Decimal::new(DEFAULT_BASE_PRICE, 0));
    }

    #[test]
    fn service_names_match_by_keyword() {
        assert_eq!(base_price("HVAC Services"), Decimal::new(350, 0));
        assert_eq!(base_price("Emergency Plumbing"), Decimal::new(275, 0));
        assert_eq!(base_price("Kitchen Remodel"), Decimal::new(2500, 0));
    }

    #[test]
    fn large_square_footage_scales_by_one_point_two() {
        let details = details(&[("square_footage", "1,200 sq ft")]);
        assert_eq!(adjusted_price("HVAC Services", &details), Decimal::new(420, 0));
    }

    #[test]
    fn square_footage_at_the_threshold_does_not_scale() {
        let details = details(&[("square_footage", "1000")]);
        assert_eq!(adjusted_price("HVAC Services", &details), Decimal::new(350, 0));
    }

    #[test]
    fn emergency_urgency_scales_by_one_point_five() {
        let details = details(&[("urgency", "This is an emergency!")]);
        assert_eq!(adjusted_price("HVAC Services", &details), Decimal::new(525, 0));
    }

    #[test]
    fn textual_size_adjusts_in_both_directions() {
        let large = details(&[("kitchen_size", "Large")]);
        let small = details(&[("kitchen_size", "small galley")]);
        assert_eq!(adjusted_price("Kitchen Remodel", &large), Decimal::new(3000, 0));
        assert_eq!(adjusted_price("Kitchen Remodel", &small), Decimal::new(2000, 0));
    }

    #[test]
    fn adjustments_compose() {
        let details = details(&[("square_footage", "2400"), ("urgency", "emergency repair")]);
        // 350 x 1.2 x 1.5
        assert_eq!(adjusted_price("HVAC Services", &details), Decimal::new(630, 0));
    }

    #[test]
    fn heuristic_range_brackets_the_price() {
        let range = heuristic_range(Decimal::new(200, 0));
        assert_eq!(range.low, Decimal::new(160, 0));
        assert_eq!(range.high, Decimal::new(240, 0));
    }
}
