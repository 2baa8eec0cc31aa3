use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use homequote_core::domain::catalog::{Requirement, Service};
use homequote_core::domain::lead::{LeadData, LeadId};
use homequote_core::domain::quote::QuoteRequest;
use homequote_core::domain::session::{BusinessId, ConversationSession, ServiceId, SessionId};
use homequote_core::stores::{
    LeadStore, QuoteReceipt, ServiceCatalog, SessionStore, StoreError,
};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationSession>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<ConversationSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned())
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.0.clone(), session.clone());
        Ok(())
    }

    async fn create(&self, business_id: &BusinessId) -> Result<ConversationSession, StoreError> {
        let session = ConversationSession::new(business_id.clone());
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.0.clone(), session.clone());
        Ok(session)
    }
}

pub struct InMemoryServiceCatalog {
    services: Vec<Service>,
    requirements: HashMap<String, Vec<Requirement>>,
}

impl InMemoryServiceCatalog {
    pub fn new(entries: Vec<(Service, Vec<Requirement>)>) -> Self {
        let mut services = Vec::with_capacity(entries.len());
        let mut requirements = HashMap::with_capacity(entries.len());
        for (service, service_requirements) in entries {
            requirements.insert(service.id.0.clone(), service_requirements);
            services.push(service);
        }
        Self { services, requirements }
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryServiceCatalog {
    async fn get_requirements(
        &self,
        service_id: &ServiceId,
    ) -> Result<Vec<Requirement>, StoreError> {
        Ok(self.requirements.get(&service_id.0).cloned().unwrap_or_default())
    }

    async fn get_services(&self, _business_id: &BusinessId) -> Result<Vec<Service>, StoreError> {
        Ok(self.services.clone())
    }
}

#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<HashMap<(String, String), LeadId>>,
    quote_requests: RwLock<Vec<QuoteRequest>>,
}

impl InMemoryLeadStore {
    pub async fn quote_requests(&self) -> Vec<QuoteRequest> {
        self.quote_requests.read().await.clone()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn upsert_lead(
        &self,
        business_id: &BusinessId,
        lead: &LeadData,
    ) -> Result<LeadId, StoreError> {
        let email = lead.email.clone().unwrap_or_default();
        let mut leads = self.leads.write().await;
        let id = leads
            .entry((business_id.0.clone(), email))
            .or_insert_with(|| LeadId(Uuid::new_v4().to_string()));
        Ok(id.clone())
    }

    async fn create_quote_request(
        &self,
        request: &QuoteRequest,
    ) -> Result<QuoteReceipt, StoreError> {
        let mut quote_requests = self.quote_requests.write().await;
        quote_requests.push(request.clone());
        Ok(QuoteReceipt { quote_id: request.id.clone(), created_at: Utc::now() })
    }
}

#[cfg(test)]
mod tests {
    use homequote_core::domain::lead::LeadData;
    use homequote_core::domain::session::{BusinessId, SessionState};
    use homequote_core::stores::{LeadStore, SessionStore};

    use super::{InMemoryLeadStore, InMemorySessionStore};

    #[tokio::test]
    async fn sessions_round_trip() {
        let store = InMemorySessionStore::default();
        let mut session =
            store.create(&BusinessId("biz-1".to_string())).await.expect("create");
        session.state = SessionState::CartComplete;
        store.save(&session).await.expect("save");

        let loaded = store.load(&session.id).await.expect("load").expect("present");
        assert_eq!(loaded.state, SessionState::CartComplete);
    }

    #[tokio::test]
    async fn leads_deduplicate_by_business_and_email() {
        let store = InMemoryLeadStore::default();
        let business = BusinessId("biz-1".to_string());
        let lead = LeadData {
            name: Some("John".to_string()),
            email: Some("john@example.com".to_string()),
            phone: Some("(312) 555-0198".to_string()),
        };

        let first = store.upsert_lead(&business, &lead).await.expect("upsert");
        let second = store.upsert_lead(&business, &lead).await.expect("upsert");
        assert_eq!(first, second);

        let other_business = BusinessId("biz-2".to_string());
        let third = store.upsert_lead(&other_business, &lead).await.expect("upsert");
        assert_ne!(first, third);
    }
}
