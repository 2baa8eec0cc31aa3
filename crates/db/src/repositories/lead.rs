use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use homequote_core::domain::lead::{LeadData, LeadId};
use homequote_core::domain::quote::QuoteRequest;
use homequote_core::domain::session::BusinessId;
use homequote_core::stores::{LeadStore, QuoteReceipt, StoreError};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlLeadStore {
    pool: DbPool,
}

impl SqlLeadStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Leads are deduplicated by (business, email); a repeat submission
    /// refreshes name and phone instead of creating a second lead.
    async fn upsert(
        &self,
        business_id: &BusinessId,
        lead: &LeadData,
    ) -> Result<LeadId, RepositoryError> {
        let existing = match &lead.email {
            Some(email) => {
                sqlx::query("SELECT id FROM leads WHERE business_id = ?1 AND email = ?2")
                    .bind(&business_id.0)
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        if let Some(row) = existing {
            let id: String = row.try_get("id").map_err(RepositoryError::Database)?;
            sqlx::query(
                "UPDATE leads SET name = ?2, phone = ?3, updated_at = ?4 WHERE id = ?1",
            )
            .bind(&id)
            .bind(&lead.name)
            .bind(&lead.phone)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
            return Ok(LeadId(id));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO leads (id, business_id, name, email, phone, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(&business_id.0)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(LeadId(id))
    }

    async fn insert_quote_request(
        &self,
        request: &QuoteRequest,
    ) -> Result<QuoteReceipt, RepositoryError> {
        let document = serde_json::to_string(request)?;
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO quote_requests (id, business_id, lead_id, session_id, document, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&request.id.0)
        .bind(&request.business_id.0)
        .bind(&request.lead_id.0)
        .bind(&request.session_id.0)
        .bind(document)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(QuoteReceipt { quote_id: request.id.clone(), created_at })
    }
}

#[async_trait]
impl LeadStore for SqlLeadStore {
    async fn upsert_lead(
        &self,
        business_id: &BusinessId,
        lead: &LeadData,
    ) -> Result<LeadId, StoreError> {
        self.upsert(business_id, lead).await.map_err(StoreError::from)
    }

    async fn create_quote_request(
        &self,
        request: &QuoteRequest,
    ) -> Result<QuoteReceipt, StoreError> {
        self.insert_quote_request(request).await.map_err(StoreError::from)
    }
}
