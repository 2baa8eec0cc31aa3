//! Quote finalization: estimate, formatted summary, lead capture, and the
//! quote request itself. Every collaborator call is bounded and has a
//! deterministic fallback, so finalization always produces a reply.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;

use homequote_core::domain::cart::{format_range, CartItem};
use homequote_core::domain::estimate::EstimateResult;
use homequote_core::domain::quote::{QuoteRequest, QuoteRequestId, QuoteRequestStatus};
use homequote_core::domain::session::{ConversationSession, LeadStep};
use homequote_core::stores::LeadStore;

use crate::estimate::{Estimator, HeuristicEstimator};

#[derive(Clone, Debug, PartialEq)]
pub enum FinalizeOutcome {
    /// Nothing to finalize; the conversation continues where it was.
    ContinueConversation { reply: String },
    /// Waiting on one more lead detail.
    AwaitLead { reply: String, step: LeadStep },
    /// The quote request was persisted.
    Completed { reply: String, quote_id: QuoteRequestId },
}

pub struct QuoteFinalizer {
    estimator: Arc<dyn Estimator>,
    leads: Arc<dyn LeadStore>,
    collaborator_timeout: Duration,
}

impl QuoteFinalizer {
    pub fn new(
        estimator: Arc<dyn Estimator>,
        leads: Arc<dyn LeadStore>,
        collaborator_timeout: Duration,
    ) -> Self {
        Self { estimator, leads, collaborator_timeout }
    }

    /// Entry point: estimate the cart and either finish directly (lead
    /// already complete) or start collecting contact details. An empty cart
    /// never reaches the estimator.
    pub async fn begin(&self, session: &mut ConversationSession) -> FinalizeOutcome {
        if session.cart_items.is_empty() {
            return FinalizeOutcome::ContinueConversation {
                reply: "Your cart is empty, so there's nothing to quote yet. Tell me which \
                        service you need and we'll build one."
                    .to_string(),
            };
        }

        let estimate = self.estimate_cart(&session.cart_items).await;
        let summary = build_summary(&session.cart_items, &estimate);
        session.pending_estimate = Some(estimate);

        match session.lead_data.next_missing() {
            None => self.submit(session).await,
            Some(step) => FinalizeOutcome::AwaitLead {
                reply: format!("{summary}\n\n{}", prompt_for(step, session)),
                step,
            },
        }
    }

    /// One turn of lead collection. Invalid input re-prompts the same step
    /// without persisting anything.
    pub async fn handle_lead_turn(
        &self,
        session: &mut ConversationSession,
        step: LeadStep,
        text: &str,
    ) -> FinalizeOutcome {
        // A completed lead means a previous submission failed downstream;
        // retry it instead of re-parsing contact details.
        if session.lead_data.is_complete() {
            return self.submit(session).await;
        }

        let trimmed = text.trim();
        match step {
            LeadStep::Name => {
                if trimmed.len() < 2 {
                    return FinalizeOutcome::AwaitLead {
                        reply: "Sorry, I didn't catch that. What name should go on the quote?"
                            .to_string(),
                        step,
                    };
                }
                session.lead_data.name = Some(trimmed.to_string());
            }
            LeadStep::Email => match parse_email(trimmed) {
                Some(email) => session.lead_data.email = Some(email),
                None => {
                    return FinalizeOutcome::AwaitLead {
                        reply: "That doesn't look like a valid email address. Could you \
                                double-check it?"
                            .to_string(),
                        step,
                    };
                }
            },
            LeadStep::Phone => match normalize_phone(trimmed) {
                Some(phone) => session.lead_data.phone = Some(phone),
                None => {
                    return FinalizeOutcome::AwaitLead {
                        reply: "I need a 10-digit phone number, like (312) 555-0198. Could you \
                                try again?"
                            .to_string(),
                        step,
                    };
                }
            },
        }

        match session.lead_data.next_missing() {
            Some(next) => FinalizeOutcome::AwaitLead { reply: prompt_for(next, session), step: next },
            None => self.submit(session).await,
        }
    }

    async fn estimate_cart(&self, items: &[CartItem]) -> EstimateResult {
        let attempt = timeout(self.collaborator_timeout, self.estimator.estimate(items, None)).await;
        match attempt {
            Ok(Ok(estimate)) => estimate,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "estimator failed, using heuristic estimate");
                HeuristicEstimator::estimate_items(items)
            }
            Err(_) => {
                tracing::warn!("estimator timed out, using heuristic estimate");
                HeuristicEstimator::estimate_items(items)
            }
        }
    }

    async fn submit(&self, session: &mut ConversationSession) -> FinalizeOutcome {
        let estimate = session
            .pending_estimate
            .clone()
            .unwrap_or_else(|| HeuristicEstimator::estimate_items(&session.cart_items));
        let summary = build_summary(&session.cart_items, &estimate);

        let lead_id = match timeout(
            self.collaborator_timeout,
            self.leads.upsert_lead(&session.business_id, &session.lead_data),
        )
        .await
        {
            Ok(Ok(lead_id)) => lead_id,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "lead upsert failed");
                return retry_later(session);
            }
            Err(_) => {
                tracing::warn!("lead upsert timed out");
                return retry_later(session);
            }
        };

        let request = QuoteRequest {
            id: QuoteRequestId::generate(),
            business_id: session.business_id.clone(),
            lead_id,
            cart_items: session.cart_items.clone(),
            ai_estimate: estimate.clone(),
            quote_summary: summary,
            total_estimate: estimate.total,
            status: QuoteRequestStatus::Submitted,
            session_id: session.id.clone(),
            created_at: Utc::now(),
        };

        let receipt = match timeout(
            self.collaborator_timeout,
            self.leads.create_quote_request(&request),
        )
        .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "quote request creation failed");
                return retry_later(session);
            }
            Err(_) => {
                tracing::warn!("quote request creation timed out");
                return retry_later(session);
            }
        };

        session.pending_estimate = None;

        let name = session.lead_data.name.clone().unwrap_or_else(|| "there".to_string());
        let email = session.lead_data.email.clone().unwrap_or_default();
        FinalizeOutcome::Completed {
            reply: format!(
                "You're all set, {name}! Your quote request {} has been submitted and a copy is \
                 on its way to {email}. Someone will follow up shortly.",
                receipt.quote_id.0
            ),
            quote_id: receipt.quote_id,
        }
    }
}

/// Persistence hiccups keep the session where it is; the customer can try
/// again and nothing was double-created.
fn retry_later(session: &ConversationSession) -> FinalizeOutcome {
    let step = session.lead_data.next_missing().unwrap_or(LeadStep::Phone);
    FinalizeOutcome::AwaitLead {
        reply: "I couldn't submit your quote just now. Give me a moment and say \"submit\" to \
                try again."
            .to_string(),
        step,
    }
}

fn prompt_for(step: LeadStep, session: &ConversationSession) -> String {
    match step {
        LeadStep::Name => "Can I get your name for the quote?".to_string(),
        LeadStep::Email => match &session.lead_data.name {
            Some(name) => format!("Thanks, {name}! What's the best email address for the quote?"),
            None => "What's the best email address for the quote?".to_string(),
        },
        LeadStep::Phone => "Great. And a phone number where we can reach you?".to_string(),
    }
}

fn build_summary(items: &[CartItem], estimate: &EstimateResult) -> String {
    let mut summary = String::from("Here's your estimate:\n");
    for item in items {
        let line = estimate
            .breakdown
            .iter()
            .find(|line| line.service_id == item.service_id)
            .map(|line| format_range(&line.price))
            .unwrap_or_else(|| "pending".to_string());
        summary.push_str(&format!("- {}: {}\n", item.service_name, line));
    }
    summary.push_str(&format!("Total: {}\n\n", format_range(&estimate.total)));
    summary.push_str(&estimate.explanation);
    summary.push_str("\n\n");
    summary.push_str(&estimate.disclaimer);
    summary
}

fn parse_email(text: &str) -> Option<String> {
    let candidate = text.trim();
    if candidate.contains(char::is_whitespace) {
        return None;
    }
    let (local, domain) = candidate.split_once('@')?;
    if local.is_empty() || domain.contains('@') {
        return None;
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return None;
    }
    Some(candidate.to_string())
}

/// `(NNN) NNN-NNNN`, or `+1 (NNN) NNN-NNNN` for 11-digit numbers with a
/// leading 1.
fn normalize_phone(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|ch| ch.is_ascii_digit()).collect();
    let (prefix, rest) = match digits.len() {
        10 => ("", &digits[..]),
        11 if digits.starts_with('1') => ("+1 ", &digits[1..]),
        _ => return None,
    };
    Some(format!("{prefix}({}) {}-{}", &rest[..3], &rest[3..6], &rest[6..]))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use homequote_core::domain::cart::CartItem;
    use homequote_core::domain::lead::{LeadData, LeadId};
    use homequote_core::domain::quote::QuoteRequest;
    use homequote_core::domain::session::{BusinessId, ConversationSession, LeadStep, ServiceId};
    use homequote_core::stores::{LeadStore, QuoteReceipt, StoreError};

    use crate::estimate::HeuristicEstimator;

    use super::{normalize_phone, parse_email, FinalizeOutcome, QuoteFinalizer};

    #[derive(Default)]
    struct RecordingLeadStore {
        upsert_calls: AtomicUsize,
        quote_requests: AtomicUsize,
        fail_upsert: bool,
    }

    #[async_trait]
    impl LeadStore for RecordingLeadStore {
        async fn upsert_lead(
            &self,
            _business_id: &BusinessId,
            _lead: &LeadData,
        ) -> Result<LeadId, StoreError> {
            self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_upsert {
                return Err(StoreError::Backend("down".to_string()));
            }
            Ok(LeadId("lead-1".to_string()))
        }

        async fn create_quote_request(
            &self,
            request: &QuoteRequest,
        ) -> Result<QuoteReceipt, StoreError> {
            self.quote_requests.fetch_add(1, Ordering::SeqCst);
            Ok(QuoteReceipt { quote_id: request.id.clone(), created_at: Utc::now() })
        }
    }

    struct PanickingEstimator;

    #[async_trait]
    impl crate::estimate::Estimator for PanickingEstimator {
        async fn estimate(
            &self,
            _items: &[CartItem],
            _context: Option<&str>,
        ) -> anyhow::Result<homequote_core::domain::estimate::EstimateResult> {
            panic!("the estimator must not be called for an empty cart");
        }
    }

    fn finalizer(leads: Arc<RecordingLeadStore>) -> QuoteFinalizer {
        QuoteFinalizer::new(Arc::new(HeuristicEstimator), leads, Duration::from_secs(2))
    }

    fn item(id: &str, name: &str) -> CartItem {
        CartItem {
            service_id: ServiceId(id.to_string()),
            service_name: name.to_string(),
            collected_details: BTreeMap::new(),
            estimated_price: Decimal::new(200, 0),
            added_at: Utc::now(),
        }
    }

    fn session_with_cart() -> ConversationSession {
        let mut session = ConversationSession::new(BusinessId("biz-1".to_string()));
        session.cart_items = vec![item("hvac", "HVAC Services")];
        session
    }

    #[tokio::test]
    async fn empty_cart_continues_the_conversation_without_estimating() {
        let leads = Arc::new(RecordingLeadStore::default());
        let finalizer = QuoteFinalizer::new(
            Arc::new(PanickingEstimator),
            leads.clone(),
            Duration::from_secs(2),
        );
        let mut session = ConversationSession::new(BusinessId("biz-1".to_string()));

        let outcome = finalizer.begin(&mut session).await;
        assert!(matches!(outcome, FinalizeOutcome::ContinueConversation { .. }));
        assert_eq!(leads.quote_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn begin_summarizes_and_asks_for_the_first_missing_lead_field() {
        let finalizer = finalizer(Arc::new(RecordingLeadStore::default()));
        let mut session = session_with_cart();

        let outcome = finalizer.begin(&mut session).await;
        match outcome {
            FinalizeOutcome::AwaitLead { reply, step } => {
                assert!(reply.contains("HVAC Services"));
                assert!(reply.contains("Total:"));
                assert!(reply.contains("your name"));
                assert_eq!(step, LeadStep::Name);
            }
            other => panic!("expected lead capture, got {other:?}"),
        }
        assert!(session.pending_estimate.is_some());
    }

    #[tokio::test]
    async fn partially_known_leads_skip_to_the_missing_step() {
        // Name already captured: the next prompt must ask for email.
        let finalizer = finalizer(Arc::new(RecordingLeadStore::default()));
        let mut session = session_with_cart();
        session.lead_data.name = Some("John".to_string());

        let outcome = finalizer.begin(&mut session).await;
        match outcome {
            FinalizeOutcome::AwaitLead { reply, step } => {
                assert_eq!(step, LeadStep::Email);
                assert!(reply.contains("email"));
            }
            other => panic!("expected email step, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_email_re_prompts_without_advancing() {
        let finalizer = finalizer(Arc::new(RecordingLeadStore::default()));
        let mut session = session_with_cart();
        session.lead_data.name = Some("John".to_string());

        let outcome = finalizer
            .handle_lead_turn(&mut session, LeadStep::Email, "not-an-email")
            .await;
        match outcome {
            FinalizeOutcome::AwaitLead { step, .. } => assert_eq!(step, LeadStep::Email),
            other => panic!("expected re-prompt, got {other:?}"),
        }
        assert!(session.lead_data.email.is_none());
    }

    #[tokio::test]
    async fn full_lead_flow_submits_the_quote_request() {
        let leads = Arc::new(RecordingLeadStore::default());
        let finalizer = finalizer(leads.clone());
        let mut session = session_with_cart();

        finalizer.begin(&mut session).await;
        finalizer.handle_lead_turn(&mut session, LeadStep::Name, "John Smith").await;
        finalizer
            .handle_lead_turn(&mut session, LeadStep::Email, "john@example.com")
            .await;
        let outcome = finalizer
            .handle_lead_turn(&mut session, LeadStep::Phone, "312-555-0198")
            .await;

        match outcome {
            FinalizeOutcome::Completed { reply, quote_id } => {
                assert!(reply.contains(&quote_id.0));
                assert!(reply.contains("john@example.com"));
                assert!(quote_id.0.starts_with("QR-"));
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(leads.quote_requests.load(Ordering::SeqCst), 1);
        assert_eq!(session.lead_data.phone.as_deref(), Some("(312) 555-0198"));
        assert!(session.pending_estimate.is_none());
    }

    #[tokio::test]
    async fn failed_submission_keeps_the_lead_and_allows_retry() {
        let leads = Arc::new(RecordingLeadStore { fail_upsert: true, ..Default::default() });
        let finalizer = finalizer(leads.clone());
        let mut session = session_with_cart();
        session.lead_data = LeadData {
            name: Some("John".to_string()),
            email: Some("john@example.com".to_string()),
            phone: Some("(312) 555-0198".to_string()),
        };

        let outcome = finalizer.begin(&mut session).await;
        assert!(matches!(outcome, FinalizeOutcome::AwaitLead { .. }));
        assert!(session.lead_data.is_complete(), "lead data must survive the failure");
        assert_eq!(leads.quote_requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn email_validation_rejects_the_obvious_garbage() {
        assert!(parse_email("john@example.com").is_some());
        assert!(parse_email("j.doe+quotes@mail.co.uk").is_some());
        assert!(parse_email("not-an-email").is_none());
        assert!(parse_email("two words@example.com").is_none());
        assert!(parse_email("dot@ending.").is_none());
        assert!(parse_email("@example.com").is_none());
    }

    #[test]
    fn phone_normalization_handles_ten_and_eleven_digits() {
        assert_eq!(normalize_phone("3125550198").as_deref(), Some("(312) 555-0198"));
        assert_eq!(normalize_phone("(312) 555-0198").as_deref(), Some("(312) 555-0198"));
        assert_eq!(normalize_phone("1-312-555-0198").as_deref(), Some("+1 (312) 555-0198"));
        assert!(normalize_phone("555-0198").is_none());
        assert!(normalize_phone("23125550198").is_none());
    }
}
