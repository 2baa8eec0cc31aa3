//! End-to-end conversation flows over the demo catalog and in-memory
//! stores.

use std::sync::Arc;
use std::time::Duration;

use homequote_agent::answer::StaticKnowledgeAnswerer;
use homequote_agent::estimate::HeuristicEstimator;
use homequote_agent::intent::{CatalogServiceIdentifier, KeywordIntentClassifier};
use homequote_agent::orchestrator::{Collaborators, SessionOrchestrator};
use homequote_agent::runtime::SessionRuntime;
use homequote_core::domain::session::{LeadStep, SessionState};
use homequote_db::fixtures;
use homequote_db::{InMemoryLeadStore, InMemorySessionStore};

struct Harness {
    runtime: SessionRuntime,
    leads: Arc<InMemoryLeadStore>,
}

fn harness() -> Harness {
    let catalog = Arc::new(fixtures::demo_catalog());
    let leads = Arc::new(InMemoryLeadStore::default());
    let orchestrator = SessionOrchestrator::new(
        Collaborators {
            catalog: catalog.clone(),
            intents: Arc::new(KeywordIntentClassifier),
            identifier: Arc::new(CatalogServiceIdentifier::new(catalog)),
            answerer: Arc::new(StaticKnowledgeAnswerer),
            estimator: Arc::new(HeuristicEstimator),
            leads: leads.clone(),
        },
        Duration::from_secs(2),
    );
    Harness {
        runtime: SessionRuntime::new(Arc::new(InMemorySessionStore::default()), orchestrator),
        leads,
    }
}

#[tokio::test]
async fn two_service_conversation_ends_in_a_quote_request() {
    let harness = harness();
    let business = fixtures::demo_business_id();

    let opened = harness
        .runtime
        .handle_message(None, &business, "Hi, I need a quote to fix my furnace")
        .await
        .expect("open session");
    let session_id = opened.session_id.clone();
    assert_eq!(opened.state, SessionState::GatheringDetails);

    let send = |text: &'static str| {
        let runtime = &harness.runtime;
        let business = business.clone();
        let session_id = session_id.clone();
        async move {
            runtime
                .handle_message(Some(&session_id), &business, text)
                .await
                .expect("turn")
        }
    };

    send("central air").await;
    send("1400 sq ft").await;
    let confirm = send("123 Main St").await;
    assert_eq!(confirm.state, SessionState::AwaitingCartConfirmation);
    assert!(confirm.reply.contains("add it to your cart"));

    let added = send("yes please").await;
    assert_eq!(added.state, SessionState::CartComplete);
    assert!(added.reply.contains("HVAC Services"));

    // Second service: the address is already known and must not be asked
    // again.
    let second = send("can you also mow the lawn?").await;
    assert_eq!(second.state, SessionState::AwaitingCartConfirmation);
    assert!(second.reply.contains("Lawn Mowing"));

    let cart = send("yes").await;
    assert_eq!(cart.state, SessionState::CartComplete);

    let estimate = send("that's all, get my quote").await;
    assert_eq!(estimate.state, SessionState::AwaitingLeadDetails { step: LeadStep::Name });
    assert!(estimate.reply.contains("Total:"));

    send("Jane Doe").await;
    let bad_email = send("janedoe at example dot com").await;
    assert_eq!(bad_email.state, SessionState::AwaitingLeadDetails { step: LeadStep::Email });

    send("jane@example.com").await;
    let completed = send("1 (312) 555-0198").await;
    assert_eq!(completed.state, SessionState::QuoteCompleted);
    assert!(completed.reply.contains("jane@example.com"));

    let requests = harness.leads.quote_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].cart_items.len(), 2);
    assert!(requests[0].total_estimate.low > rust_decimal::Decimal::ZERO);
}

#[tokio::test]
async fn cart_mutations_are_confirmed_before_applying() {
    let harness = harness();
    let business = fixtures::demo_business_id();

    let opened = harness
        .runtime
        .handle_message(None, &business, "quote for lawn mowing")
        .await
        .expect("open");
    let session_id = opened.session_id.clone();

    harness
        .runtime
        .handle_message(Some(&session_id), &business, "44 Cedar Ln")
        .await
        .expect("address");
    harness
        .runtime
        .handle_message(Some(&session_id), &business, "yes")
        .await
        .expect("add");

    let staged = harness
        .runtime
        .handle_message(Some(&session_id), &business, "actually remove the lawn mowing")
        .await
        .expect("stage removal");
    assert_eq!(staged.state, SessionState::AwaitingCartRemovalConfirmation);

    let declined = harness
        .runtime
        .handle_message(Some(&session_id), &business, "no wait, keep it")
        .await
        .expect("decline");
    assert_eq!(declined.state, SessionState::CartComplete);
    assert!(declined.reply.contains("Lawn Mowing"));

    let viewed = harness
        .runtime
        .handle_message(Some(&session_id), &business, "show my cart")
        .await
        .expect("view");
    assert!(viewed.reply.contains("Lawn Mowing"));
    assert_eq!(viewed.state, SessionState::CartComplete);
}
