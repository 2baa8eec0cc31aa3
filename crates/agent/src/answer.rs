use anyhow::Result;
use async_trait::async_trait;

use homequote_core::domain::session::BusinessId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnowledgeAnswer {
    pub response: String,
    pub context_used: bool,
    pub confidence: u8,
}

/// Boundary to the question-answering subsystem. Only the contract lives
/// here; retrieval happens elsewhere.
#[async_trait]
pub trait KnowledgeAnswerer: Send + Sync {
    async fn answer(&self, business_id: &BusinessId, text: &str) -> Result<KnowledgeAnswer>;
}

/// Fallback answerer used when no retrieval backend is wired in: steers the
/// customer back toward building a quote.
#[derive(Clone, Debug, Default)]
pub struct StaticKnowledgeAnswerer;

#[async_trait]
impl KnowledgeAnswerer for StaticKnowledgeAnswerer {
    async fn answer(&self, _business_id: &BusinessId, _text: &str) -> Result<KnowledgeAnswer> {
        Ok(KnowledgeAnswer {
            response: "Happy to help with that. I can also put together a price estimate - just \
                       tell me which service you need."
                .to_string(),
            context_used: false,
            confidence: 20,
        })
    }
}
