use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::{CartItem, PriceRange};
use crate::domain::estimate::EstimateResult;
use crate::domain::lead::LeadId;
use crate::domain::session::{BusinessId, SessionId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRequestId(pub String);

impl QuoteRequestId {
    /// Human-readable reference id handed back to the customer.
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(format!("QR-{}", raw[..8].to_ascii_uppercase()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteRequestStatus {
    Submitted,
    Reviewed,
    Sent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: QuoteRequestId,
    pub business_id: BusinessId,
    pub lead_id: LeadId,
    pub cart_items: Vec<CartItem>,
    pub ai_estimate: EstimateResult,
    pub quote_summary: String,
    pub total_estimate: PriceRange,
    pub status: QuoteRequestStatus,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
}
