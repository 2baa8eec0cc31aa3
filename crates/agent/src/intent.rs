//! Global intent classification and service identification. Both are
//! swappable trait boundaries; the bundled implementations are keyword
//! heuristics in the same spirit as the rest of the NLU layer.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use homequote_core::domain::catalog::Service;
use homequote_core::domain::session::{BusinessId, UserIntent};
use homequote_core::stores::ServiceCatalog;

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<UserIntent>;
}

const QUOTE_MARKERS: &[&str] = &[
    "quote", "estimate", "price", "cost", "how much", "need", "install", "repair", "fix",
    "replace", "remodel", "broken", "leaking", "service for", "come out", "appointment",
];

/// Keyword classifier: quote-ish phrasing wins, everything else is treated
/// as a question.
#[derive(Clone, Debug, Default)]
pub struct KeywordIntentClassifier;

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify(&self, text: &str) -> Result<UserIntent> {
        let lowered = text.to_ascii_lowercase();
        let quote_building = QUOTE_MARKERS.iter().any(|marker| lowered.contains(marker));
        Ok(if quote_building { UserIntent::QuoteBuilding } else { UserIntent::QuestionAnswering })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifiedServices {
    pub matched: Vec<Service>,
    pub needs_fallback: bool,
    pub confidence: u8,
}

#[async_trait]
pub trait ServiceIdentifier: Send + Sync {
    async fn identify(&self, business_id: &BusinessId, text: &str) -> Result<IdentifiedServices>;
}

/// Category keywords mirrored from the cart matcher so "my furnace is dead"
/// finds an HVAC service even when the catalog name never appears.
const SERVICE_HINTS: &[(&str, &[&str])] = &[
    ("hvac", &["hvac", "heating", "cooling", "furnace", "air conditioning", "heat pump", "ac"]),
    ("plumbing", &["plumbing", "plumber", "pipe", "drain", "leak", "water heater", "faucet"]),
    ("kitchen", &["kitchen", "cabinet", "countertop"]),
    ("bathroom", &["bathroom", "bath", "shower", "toilet"]),
    ("electrical", &["electrical", "electrician", "wiring", "outlet", "panel", "breaker"]),
    ("roofing", &["roof", "roofing", "shingle", "gutter"]),
    ("lawn", &["lawn", "mowing", "grass", "yard"]),
    ("tree", &["tree", "stump", "branch"]),
];

pub struct CatalogServiceIdentifier {
    catalog: Arc<dyn ServiceCatalog>,
}

impl CatalogServiceIdentifier {
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ServiceIdentifier for CatalogServiceIdentifier {
    async fn identify(&self, business_id: &BusinessId, text: &str) -> Result<IdentifiedServices> {
        let services = self.catalog.get_services(business_id).await?;
        if services.is_empty() {
            return Ok(IdentifiedServices { matched: Vec::new(), needs_fallback: true, confidence: 0 });
        }

        let lowered = text.to_ascii_lowercase();
        let mut matched: Vec<Service> = Vec::new();

        // Direct name mentions first.
        for service in &services {
            if lowered.contains(&service.name.to_ascii_lowercase()) {
                matched.push(service.clone());
            }
        }

        // Then category hints against service names.
        for (_, keywords) in SERVICE_HINTS {
            let hinted = keywords.iter().any(|keyword| contains_word(&lowered, keyword));
            if !hinted {
                continue;
            }
            let hit = services.iter().find(|service| {
                let name = service.name.to_ascii_lowercase();
                keywords.iter().any(|keyword| name.contains(keyword))
            });
            if let Some(service) = hit {
                if !matched.iter().any(|existing| existing.id == service.id) {
                    matched.push(service.clone());
                }
            }
        }

        let confidence = match matched.len() {
            0 => 0,
            1 => 80,
            _ => 65,
        };
        Ok(IdentifiedServices { needs_fallback: matched.is_empty(), matched, confidence })
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    if word.contains(' ') {
        return haystack.contains(word);
    }
    haystack.split(|ch: char| !ch.is_ascii_alphanumeric()).any(|token| token == word)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use homequote_core::domain::catalog::{Requirement, Service};
    use homequote_core::domain::session::{BusinessId, ServiceId, UserIntent};
    use homequote_core::stores::{ServiceCatalog, StoreError};

    use super::{
        CatalogServiceIdentifier, IntentClassifier, KeywordIntentClassifier, ServiceIdentifier,
    };

    struct StubCatalog {
        services: Vec<Service>,
    }

    #[async_trait]
    impl ServiceCatalog for StubCatalog {
        async fn get_requirements(
            &self,
            _service_id: &ServiceId,
        ) -> Result<Vec<Requirement>, StoreError> {
            Ok(Vec::new())
        }

        async fn get_services(
            &self,
            _business_id: &BusinessId,
        ) -> Result<Vec<Service>, StoreError> {
            Ok(self.services.clone())
        }
    }

    fn service(id: &str, name: &str) -> Service {
        Service { id: ServiceId(id.to_string()), name: name.to_string(), description: None }
    }

    #[tokio::test]
    async fn quote_phrasing_classifies_as_quote_building() {
        let classifier = KeywordIntentClassifier;
        let intent = classifier.classify("I need a quote for my furnace").await.expect("classify");
        assert_eq!(intent, UserIntent::QuoteBuilding);
    }

    #[tokio::test]
    async fn questions_default_to_question_answering() {
        let classifier = KeywordIntentClassifier;
        let intent = classifier.classify("what are your opening hours?").await.expect("classify");
        assert_eq!(intent, UserIntent::QuestionAnswering);
    }

    #[tokio::test]
    async fn identifier_matches_direct_names_and_hints() {
        let identifier = CatalogServiceIdentifier::new(Arc::new(StubCatalog {
            services: vec![service("hvac", "HVAC Services"), service("lawn", "Lawn Mowing")],
        }));

        let direct = identifier
            .identify(&BusinessId("biz-1".to_string()), "book hvac services please")
            .await
            .expect("identify");
        assert_eq!(direct.matched.len(), 1);
        assert!(!direct.needs_fallback);

        let hinted = identifier
            .identify(&BusinessId("biz-1".to_string()), "my furnace died last night")
            .await
            .expect("identify");
        assert_eq!(hinted.matched[0].id.0, "hvac");
    }

    #[tokio::test]
    async fn unmatched_text_requests_fallback() {
        let identifier = CatalogServiceIdentifier::new(Arc::new(StubCatalog {
            services: vec![service("lawn", "Lawn Mowing")],
        }));

        let result = identifier
            .identify(&BusinessId("biz-1".to_string()), "can you paint my fence?")
            .await
            .expect("identify");
        assert!(result.needs_fallback);
        assert!(result.matched.is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_requests_fallback() {
        let identifier = CatalogServiceIdentifier::new(Arc::new(StubCatalog { services: vec![] }));
        let result = identifier
            .identify(&BusinessId("biz-1".to_string()), "fix my furnace")
            .await
            .expect("identify");
        assert!(result.needs_fallback);
    }
}
