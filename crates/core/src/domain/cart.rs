use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::session::{DetailValue, ServiceId};

/// A priced service plus the field values it was priced against. Created
/// only by cart assembly; mutated only through a confirmed cart action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub service_id: ServiceId,
    pub service_name: String,
    pub collected_details: BTreeMap<String, DetailValue>,
    pub estimated_price: Decimal,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.collected_details.get(key).map(|detail| detail.value.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: Decimal,
    pub high: Decimal,
}

impl PriceRange {
    pub const ZERO: Self = Self { low: Decimal::ZERO, high: Decimal::ZERO };

    pub fn add(&self, other: &Self) -> Self {
        Self { low: self.low + other.low, high: self.high + other.high }
    }
}

pub fn format_dollars(amount: Decimal) -> String {
    format!("${}", amount.round_dp(0))
}

pub fn format_range(range: &PriceRange) -> String {
    format!("{} - {}", format_dollars(range.low), format_dollars(range.high))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_range, PriceRange};

    #[test]
    fn ranges_sum_componentwise() {
        let first = PriceRange { low: Decimal::new(100, 0), high: Decimal::new(150, 0) };
        let second = PriceRange { low: Decimal::new(40, 0), high: Decimal::new(60, 0) };

        let total = first.add(&second);
        assert_eq!(total.low, Decimal::new(140, 0));
        assert_eq!(total.high, Decimal::new(210, 0));
    }

    #[test]
    fn range_formats_as_whole_dollars() {
        let range = PriceRange { low: Decimal::new(2800, 1), high: Decimal::new(4200, 1) };
        assert_eq!(format_range(&range), "$280 - $420");
    }
}
