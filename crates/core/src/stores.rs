use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::catalog::{Requirement, Service};
use crate::domain::lead::{LeadData, LeadId};
use crate::domain::quote::{QuoteRequest, QuoteRequestId};
use crate::domain::session::{BusinessId, ConversationSession, ServiceId, SessionId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("store decode error: {0}")]
    Decode(String),
}

/// Single abstraction over session persistence. Implementations may keep an
/// internal read-through cache; callers never distinguish cache from durable
/// storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<ConversationSession>, StoreError>;
    /// Idempotent full overwrite of the stored session document.
    async fn save(&self, session: &ConversationSession) -> Result<(), StoreError>;
    async fn create(&self, business_id: &BusinessId) -> Result<ConversationSession, StoreError>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Ordered slot schema for one service. Order is the asking order.
    async fn get_requirements(&self, service_id: &ServiceId)
        -> Result<Vec<Requirement>, StoreError>;
    async fn get_services(&self, business_id: &BusinessId) -> Result<Vec<Service>, StoreError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteReceipt {
    pub quote_id: QuoteRequestId,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn upsert_lead(
        &self,
        business_id: &BusinessId,
        lead: &LeadData,
    ) -> Result<LeadId, StoreError>;
    async fn create_quote_request(&self, request: &QuoteRequest)
        -> Result<QuoteReceipt, StoreError>;
}
