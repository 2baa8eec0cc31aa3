pub mod chat;
pub mod config;
pub mod migrate;
pub mod smoke;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use homequote_agent::answer::StaticKnowledgeAnswerer;
use homequote_agent::estimate::{Estimator, HeuristicEstimator, NarrativeEstimator};
use homequote_agent::intent::{CatalogServiceIdentifier, KeywordIntentClassifier};
use homequote_agent::llm::HttpLlmClient;
use homequote_agent::orchestrator::{Collaborators, SessionOrchestrator};
use homequote_agent::runtime::SessionRuntime;
use homequote_core::config::AppConfig;
use homequote_core::stores::{LeadStore, SessionStore};
use homequote_db::{
    connect_with_settings, fixtures, migrations, InMemoryLeadStore, InMemorySessionStore,
    SqlLeadStore, SqlSessionStore,
};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Wires the demo catalog, the configured stores, and the estimator into a
/// ready session runtime.
pub async fn build_runtime(config: &AppConfig, durable: bool) -> Result<SessionRuntime> {
    let catalog = Arc::new(fixtures::demo_catalog());

    let (sessions, leads): (Arc<dyn SessionStore>, Arc<dyn LeadStore>) = if durable {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await?;
        migrations::run_pending(&pool).await?;
        (Arc::new(SqlSessionStore::new(pool.clone())), Arc::new(SqlLeadStore::new(pool)))
    } else {
        (Arc::new(InMemorySessionStore::default()), Arc::new(InMemoryLeadStore::default()))
    };

    let estimator = build_estimator(config);
    let orchestrator = SessionOrchestrator::new(
        Collaborators {
            catalog: catalog.clone(),
            intents: Arc::new(KeywordIntentClassifier),
            identifier: Arc::new(CatalogServiceIdentifier::new(catalog)),
            answerer: Arc::new(StaticKnowledgeAnswerer),
            estimator,
            leads,
        },
        Duration::from_secs(config.estimate.collaborator_timeout_secs),
    );

    Ok(SessionRuntime::new(sessions, orchestrator))
}

fn build_estimator(config: &AppConfig) -> Arc<dyn Estimator> {
    let Some(base_url) = config.llm.base_url.clone() else {
        return Arc::new(HeuristicEstimator);
    };

    match HttpLlmClient::new(base_url, config.llm.model.clone(), config.llm.timeout_secs) {
        Ok(client) => Arc::new(NarrativeEstimator::new(Arc::new(client))),
        Err(error) => {
            tracing::warn!(error = %error, "llm client unavailable, using heuristic estimates");
            Arc::new(HeuristicEstimator)
        }
    }
}
