use serde::{Deserialize, Serialize};

use crate::domain::cart::PriceRange;
use crate::domain::session::ServiceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Narrative,
    Heuristic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimateLineItem {
    pub service_id: ServiceId,
    pub service_name: String,
    pub price: PriceRange,
    pub note: String,
    pub source: EstimateSource,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    pub breakdown: Vec<EstimateLineItem>,
    pub total: PriceRange,
    pub explanation: String,
    pub disclaimer: String,
}

impl EstimateResult {
    pub fn total_of(breakdown: &[EstimateLineItem]) -> PriceRange {
        breakdown.iter().fold(PriceRange::ZERO, |total, item| total.add(&item.price))
    }
}
