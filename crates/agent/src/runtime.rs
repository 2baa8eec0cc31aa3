//! Session runtime: loads a session, runs one turn, saves once. Turns for
//! the same session are serialized behind a per-session async lock while
//! unrelated sessions proceed in parallel. A persistence failure never
//! blocks the reply; it is logged for follow-up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use homequote_core::domain::session::{BusinessId, MessageRole, SessionId, SessionState};
use homequote_core::errors::ApplicationError;
use homequote_core::stores::SessionStore;

use crate::orchestrator::SessionOrchestrator;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub session_id: SessionId,
    pub reply: String,
    pub state: SessionState,
}

pub struct SessionRuntime {
    store: Arc<dyn SessionStore>,
    orchestrator: SessionOrchestrator,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionRuntime {
    pub fn new(store: Arc<dyn SessionStore>, orchestrator: SessionOrchestrator) -> Self {
        Self { store, orchestrator, locks: Mutex::new(HashMap::new()) }
    }

    /// Handles one utterance. With no session id a fresh session is created
    /// and its id returned in the reply.
    pub async fn handle_message(
        &self,
        session_id: Option<&SessionId>,
        business_id: &BusinessId,
        text: &str,
    ) -> Result<TurnReply, ApplicationError> {
        let id = match session_id {
            Some(id) => id.clone(),
            None => self
                .store
                .create(business_id)
                .await
                .map_err(|error| ApplicationError::Persistence(error.to_string()))?
                .id,
        };

        // Read-then-write for one turn is a critical section per session id.
        let lock = self.lock_for(&id);
        let _guard = lock.lock().await;

        let mut session = self
            .store
            .load(&id)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
            .ok_or_else(|| {
                ApplicationError::Persistence(format!("session `{}` not found", id.0))
            })?;

        session.push_message(MessageRole::User, text);
        let outcome = self.orchestrator.handle_turn(&mut session, text).await;
        session.push_message(MessageRole::Assistant, outcome.reply.clone());

        // Write-behind tolerance: the reply goes out even when the save
        // fails.
        if let Err(error) = self.store.save(&session).await {
            tracing::warn!(
                session_id = %id.0,
                error = %error,
                "session save failed after turn; reply returned anyway"
            );
        }

        Ok(TurnReply { session_id: id, reply: outcome.reply, state: outcome.state })
    }

    fn lock_for(&self, id: &SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(id.0.clone()).or_default().clone()
    }
}
