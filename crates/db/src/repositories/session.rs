use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use homequote_core::domain::session::{BusinessId, ConversationSession, SessionId};
use homequote_core::stores::{SessionStore, StoreError};

use super::RepositoryError;
use crate::DbPool;

/// Sqlite-backed session store with an internal write-through cache.
/// Orchestration code only ever sees `load`/`save`; whether a read was
/// served from memory or disk is invisible to it.
pub struct SqlSessionStore {
    pool: DbPool,
    cache: Mutex<HashMap<String, ConversationSession>>,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, cache: Mutex::new(HashMap::new()) }
    }

    fn cache_get(&self, id: &SessionId) -> Option<ConversationSession> {
        match self.cache.lock() {
            Ok(cache) => cache.get(&id.0).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&id.0).cloned(),
        }
    }

    fn cache_put(&self, session: &ConversationSession) {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.insert(session.id.0.clone(), session.clone());
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(session.id.0.clone(), session.clone());
            }
        }
    }

    async fn fetch(&self, id: &SessionId) -> Result<Option<ConversationSession>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM sessions WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let document: String = row.try_get("document").map_err(RepositoryError::Database)?;
        let session = serde_json::from_str(&document)?;
        Ok(Some(session))
    }

    async fn persist(&self, session: &ConversationSession) -> Result<(), RepositoryError> {
        let document = serde_json::to_string(session)?;
        let state = serde_json::to_string(&session.state)?;

        sqlx::query(
            "INSERT INTO sessions (id, business_id, state, document, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                 state = excluded.state,
                 document = excluded.document,
                 updated_at = excluded.updated_at",
        )
        .bind(&session.id.0)
        .bind(&session.business_id.0)
        .bind(state)
        .bind(document)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<ConversationSession>, StoreError> {
        if let Some(session) = self.cache_get(id) {
            return Ok(Some(session));
        }

        let session = self.fetch(id).await.map_err(StoreError::from)?;
        if let Some(session) = &session {
            self.cache_put(session);
        }
        Ok(session)
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), StoreError> {
        self.persist(session).await.map_err(StoreError::from)?;
        self.cache_put(session);
        Ok(())
    }

    async fn create(&self, business_id: &BusinessId) -> Result<ConversationSession, StoreError> {
        let session = ConversationSession::new(business_id.clone());
        self.persist(&session).await.map_err(StoreError::from)?;
        self.cache_put(&session);
        Ok(session)
    }
}
