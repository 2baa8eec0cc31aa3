//! Per-conversation state machine. Routes each utterance by session state,
//! mutates the session, and always produces a reply: internal failures are
//! logged server-side and collapse into error recovery with a generic
//! apology, never into an exception for the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use homequote_core::domain::cart::format_dollars;
use homequote_core::domain::catalog::Requirement;
use homequote_core::domain::session::{CartAction, ConversationSession, SessionState, UserIntent};
use homequote_core::errors::ApplicationError;
use homequote_core::queue;
use homequote_core::stores::{LeadStore, ServiceCatalog};
use rust_decimal::Decimal;

use crate::answer::KnowledgeAnswerer;
use crate::cart_intent::{self, CartIntent, ViewRequest};
use crate::estimate::Estimator;
use crate::extract;
use crate::finalize::{FinalizeOutcome, QuoteFinalizer};
use crate::gather;
use crate::intent::{IntentClassifier, ServiceIdentifier};
use crate::mutate::{self, Confirmation, RemovalOutcome};

const APOLOGY: &str = "Sorry - something went wrong on our side. Let's pick up where we left \
                       off: tell me what you'd like to do next.";

const FINALIZE_PHRASES: &[&str] = &[
    "get my quote", "get the quote", "finalize", "finalise", "checkout", "check out",
    "that's all", "thats all", "i'm done", "im done", "submit", "proceed", "ready for the quote",
    "quote please",
];

pub struct Collaborators {
    pub catalog: Arc<dyn ServiceCatalog>,
    pub intents: Arc<dyn IntentClassifier>,
    pub identifier: Arc<dyn ServiceIdentifier>,
    pub answerer: Arc<dyn KnowledgeAnswerer>,
    pub estimator: Arc<dyn Estimator>,
    pub leads: Arc<dyn LeadStore>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub state: SessionState,
}

pub struct SessionOrchestrator {
    catalog: Arc<dyn ServiceCatalog>,
    intents: Arc<dyn IntentClassifier>,
    identifier: Arc<dyn ServiceIdentifier>,
    answerer: Arc<dyn KnowledgeAnswerer>,
    finalizer: QuoteFinalizer,
    collaborator_timeout: Duration,
}

impl SessionOrchestrator {
    pub fn new(collaborators: Collaborators, collaborator_timeout: Duration) -> Self {
        let finalizer = QuoteFinalizer::new(
            collaborators.estimator,
            collaborators.leads,
            collaborator_timeout,
        );
        Self {
            catalog: collaborators.catalog,
            intents: collaborators.intents,
            identifier: collaborators.identifier,
            answerer: collaborators.answerer,
            finalizer,
            collaborator_timeout,
        }
    }

    /// Total over (state, utterance): always returns a reply. The next state
    /// is written to the session; the caller persists it once per turn.
    pub async fn handle_turn(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> TurnOutcome {
        session.touch();
        let state = session.state.clone();

        let reply = match self.route(session, state, utterance).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::error!(
                    session_id = %session.id.0,
                    error = %error,
                    "turn failed, entering error recovery"
                );
                session.state = SessionState::ErrorRecovery;
                APOLOGY.to_string()
            }
        };

        TurnOutcome { reply, state: session.state.clone() }
    }

    async fn route(
        &self,
        session: &mut ConversationSession,
        state: SessionState,
        utterance: &str,
    ) -> Result<String, ApplicationError> {
        match state {
            SessionState::AwaitingUserIntent => self.start_flow(session, utterance).await,
            SessionState::ErrorRecovery => {
                session.state = SessionState::AwaitingUserIntent;
                self.start_flow(session, utterance).await
            }
            // Soft-terminal: a new utterance starts a fresh quote while
            // keeping the contact details and everything already answered.
            SessionState::QuoteCompleted => {
                reset_for_new_quote(session);
                self.start_flow(session, utterance).await
            }
            SessionState::GatheringDetails => self.gather_turn(session, Some(utterance)).await,
            SessionState::AwaitingCartConfirmation => {
                self.cart_confirmation_turn(session, utterance).await
            }
            SessionState::CartComplete => self.cart_turn(session, utterance).await,
            SessionState::AwaitingCartClarification => {
                session.state = SessionState::CartComplete;
                self.cart_turn(session, utterance).await
            }
            SessionState::AwaitingCartRemovalConfirmation => {
                Ok(self.removal_confirmation_turn(session, utterance))
            }
            SessionState::AwaitingCartEditValue => self.edit_value_turn(session, utterance),
            SessionState::AwaitingLeadDetails { step } => {
                let outcome = self.finalizer.handle_lead_turn(session, step, utterance).await;
                Ok(apply_finalize_outcome(session, outcome))
            }
        }
    }

    async fn start_flow(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> Result<String, ApplicationError> {
        let intent = match timeout(self.collaborator_timeout, self.intents.classify(utterance))
            .await
        {
            Ok(Ok(intent)) => intent,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "intent classifier failed, defaulting to QA");
                UserIntent::QuestionAnswering
            }
            Err(_) => {
                tracing::warn!("intent classifier timed out, defaulting to QA");
                UserIntent::QuestionAnswering
            }
        };
        session.user_intent = Some(intent);

        if intent == UserIntent::QuestionAnswering {
            return Ok(self.answer_question(session, utterance).await);
        }

        // Opportunistically harvest cross-cutting details from the opening
        // message before any question is asked.
        for (key, value) in extract::extract(utterance, None) {
            let detail = session.detail_value(value, homequote_core::DetailSource::InitialConversation);
            session.record_detail(key, detail);
        }

        let identified = match timeout(
            self.collaborator_timeout,
            self.identifier.identify(&session.business_id, utterance),
        )
        .await
        {
            Ok(Ok(identified)) => identified,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "service identification failed");
                crate::intent::IdentifiedServices {
                    matched: Vec::new(),
                    needs_fallback: true,
                    confidence: 0,
                }
            }
            Err(_) => {
                tracing::warn!("service identification timed out");
                crate::intent::IdentifiedServices {
                    matched: Vec::new(),
                    needs_fallback: true,
                    confidence: 0,
                }
            }
        };

        if identified.needs_fallback || identified.matched.is_empty() {
            return Ok(self.offer_services(session).await);
        }

        queue::enqueue(session, &identified.matched);
        queue::start_next(session);
        session.state = SessionState::GatheringDetails;
        self.gather_turn(session, None).await
    }

    async fn answer_question(&self, session: &ConversationSession, utterance: &str) -> String {
        match timeout(
            self.collaborator_timeout,
            self.answerer.answer(&session.business_id, utterance),
        )
        .await
        {
            Ok(Ok(answer)) => answer.response,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "knowledge answerer failed");
                fallback_answer()
            }
            Err(_) => {
                tracing::warn!("knowledge answerer timed out");
                fallback_answer()
            }
        }
    }

    async fn offer_services(&self, session: &ConversationSession) -> String {
        match timeout(
            self.collaborator_timeout,
            self.catalog.get_services(&session.business_id),
        )
        .await
        {
            Ok(Ok(services)) if !services.is_empty() => {
                let names: Vec<&str> =
                    services.iter().map(|service| service.name.as_str()).collect();
                format!(
                    "I can put together a quote for any of these: {}. Which one do you need?",
                    names.join(", ")
                )
            }
            _ => "Which service would you like a quote for?".to_string(),
        }
    }

    async fn gather_turn(
        &self,
        session: &mut ConversationSession,
        utterance: Option<&str>,
    ) -> Result<String, ApplicationError> {
        if session.current_service.is_none() && queue::start_next(session).is_none() {
            session.state = SessionState::AwaitingUserIntent;
            return Ok("Which service would you like a quote for?".to_string());
        }

        let active = session.current_service.clone().expect("checked above");
        let requirements = match self.requirements_for(&active.id.0).await {
            Ok(requirements) => requirements,
            Err(error) => {
                tracing::warn!(error = %error, service = %active.id.0, "requirement catalog unavailable");
                return Ok(format!(
                    "I'm having trouble pulling up what we need for {}. Give me a moment and \
                     send that again.",
                    active.name
                ));
            }
        };

        let outcome = gather::process(session, &requirements, utterance)?;
        if outcome.completed {
            session.state = SessionState::AwaitingCartConfirmation;
        }
        Ok(outcome.reply)
    }

    async fn requirements_for(
        &self,
        service_id: &str,
    ) -> Result<Vec<Requirement>, ApplicationError> {
        let id = homequote_core::ServiceId(service_id.to_string());
        match timeout(self.collaborator_timeout, self.catalog.get_requirements(&id)).await {
            Ok(Ok(requirements)) => Ok(requirements),
            Ok(Err(error)) => Err(ApplicationError::collaborator("catalog", error.to_string())),
            Err(_) => Err(ApplicationError::collaborator("catalog", "timed out")),
        }
    }

    async fn cart_confirmation_turn(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> Result<String, ApplicationError> {
        let Some(active) = session.current_service.clone() else {
            session.state = SessionState::CartComplete;
            return self.cart_turn(session, utterance).await;
        };

        match mutate::classify_confirmation(utterance) {
            Confirmation::Unclear => Ok(format!(
                "Should I add {} to your cart? A simple yes or no works.",
                active.name
            )),
            Confirmation::Positive => {
                let assembled = crate::assemble::add_current_service_to_cart(session)?;
                let item = &session.cart_items[assembled.item_index];
                let added = format!(
                    "Added {} to your cart at an estimated {}.",
                    item.service_name,
                    format_dollars(item.estimated_price)
                );
                self.advance_after_service(session, added, assembled.more_services).await
            }
            Confirmation::Negative => {
                queue::complete_current(session);
                let skipped = format!("No problem - I won't add {}.", active.name);
                let more = queue::status(session).has_more();
                self.advance_after_service(session, skipped, more).await
            }
        }
    }

    async fn advance_after_service(
        &self,
        session: &mut ConversationSession,
        lead_in: String,
        more_services: bool,
    ) -> Result<String, ApplicationError> {
        if more_services {
            queue::start_next(session);
            session.state = SessionState::GatheringDetails;
            let next_question = self.gather_turn(session, None).await?;
            return Ok(format!("{lead_in} {next_question}"));
        }

        if session.cart_items.is_empty() {
            session.state = SessionState::AwaitingUserIntent;
            return Ok(format!("{lead_in} What else can I help you with?"));
        }

        session.state = SessionState::CartComplete;
        Ok(format!(
            "{lead_in} {} You can add another service, make changes, or say \"get my quote\".",
            cart_summary(session)
        ))
    }

    async fn cart_turn(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> Result<String, ApplicationError> {
        if is_finalize_request(utterance) {
            let outcome = self.finalizer.begin(session).await;
            return Ok(apply_finalize_outcome(session, outcome));
        }

        let classified = cart_intent::classify(utterance, &session.cart_items);
        match classified.intent {
            CartIntent::Remove { item_index, .. } => {
                let reply = mutate::stage_removal(session, item_index)?;
                session.state = SessionState::AwaitingCartRemovalConfirmation;
                Ok(reply)
            }
            CartIntent::Edit { item_index, field, new_value: Some(value), .. } => {
                Ok(mutate::apply_edit(session, item_index, &field, &value)?)
            }
            CartIntent::Edit { item_index, field, new_value: None, .. } => {
                let reply = mutate::stage_edit(session, item_index, &field)?;
                session.state = SessionState::AwaitingCartEditValue;
                Ok(reply)
            }
            CartIntent::View { request } => Ok(render_view(session, request)),
            CartIntent::Unclear { suggestion } => {
                session.state = SessionState::AwaitingCartClarification;
                Ok(format!("I wasn't sure what you'd like to change. {suggestion}"))
            }
            CartIntent::NonCartRelated => self.cart_non_cart_turn(session, utterance).await,
        }
    }

    /// Text in cart context that isn't about the cart: either the customer
    /// wants another service, or it's a general question.
    async fn cart_non_cart_turn(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> Result<String, ApplicationError> {
        let identified = match timeout(
            self.collaborator_timeout,
            self.identifier.identify(&session.business_id, utterance),
        )
        .await
        {
            Ok(Ok(identified)) if !identified.needs_fallback => identified,
            _ => {
                return Ok(self.answer_question(session, utterance).await);
            }
        };

        let fresh: Vec<_> = identified
            .matched
            .into_iter()
            .filter(|service| {
                !session.cart_items.iter().any(|item| item.service_id == service.id)
            })
            .collect();
        if fresh.is_empty() {
            return Ok(format!(
                "That's already covered in your cart. {}",
                cart_summary(session)
            ));
        }

        queue::enqueue(session, &fresh);
        queue::start_next(session);
        session.state = SessionState::GatheringDetails;
        self.gather_turn(session, None).await
    }

    fn removal_confirmation_turn(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> String {
        let target_name = session
            .pending_cart_action
            .as_ref()
            .map(|pending| pending.target_service_name.clone());

        match mutate::confirm_removal(session, utterance) {
            RemovalOutcome::Removed { service_name, remaining } => {
                session.state = SessionState::CartComplete;
                if remaining == 0 {
                    format!(
                        "Removed {service_name}. Your cart is empty now - tell me which service \
                         you'd like instead."
                    )
                } else {
                    format!("Removed {service_name}. {}", cart_summary(session))
                }
            }
            RemovalOutcome::Declined => {
                session.state = SessionState::CartComplete;
                format!("Okay, keeping it. {}", cart_summary(session))
            }
            RemovalOutcome::Unclear => match target_name {
                Some(name) => format!("Should I remove {name} from your cart? (yes/no)"),
                None => "Should I remove it? (yes/no)".to_string(),
            },
            RemovalOutcome::Stale => {
                session.state = SessionState::CartComplete;
                format!("That item isn't in your cart anymore. {}", cart_summary(session))
            }
        }
    }

    fn edit_value_turn(
        &self,
        session: &mut ConversationSession,
        utterance: &str,
    ) -> Result<String, ApplicationError> {
        let pending = session.pending_cart_action.clone();
        let Some(pending) = pending.filter(|pending| pending.action == CartAction::Edit) else {
            session.pending_cart_action = None;
            session.state = SessionState::CartComplete;
            return Ok(format!("Let's take another look. {}", cart_summary(session)));
        };

        let Some(field) = pending.field_to_edit.clone() else {
            session.pending_cart_action = None;
            session.state = SessionState::CartComplete;
            return Ok(format!("Let's take another look. {}", cart_summary(session)));
        };

        let target_still_matches = session
            .cart_items
            .get(pending.item_index)
            .map(|item| item.service_id == pending.target_service_id)
            .unwrap_or(false);
        if !target_still_matches {
            session.pending_cart_action = None;
            session.state = SessionState::CartComplete;
            return Ok(format!("That item isn't in your cart anymore. {}", cart_summary(session)));
        }

        if utterance.trim().is_empty() {
            return Ok(format!("What should the {} be?", field.replace('_', " ")));
        }

        let reply = mutate::apply_edit(session, pending.item_index, &field, utterance)?;
        session.state = SessionState::CartComplete;
        Ok(reply)
    }
}

fn apply_finalize_outcome(session: &mut ConversationSession, outcome: FinalizeOutcome) -> String {
    match outcome {
        FinalizeOutcome::ContinueConversation { reply } => reply,
        FinalizeOutcome::AwaitLead { reply, step } => {
            session.state = SessionState::AwaitingLeadDetails { step };
            reply
        }
        FinalizeOutcome::Completed { reply, .. } => {
            session.state = SessionState::QuoteCompleted;
            reply
        }
    }
}

fn reset_for_new_quote(session: &mut ConversationSession) {
    session.state = SessionState::AwaitingUserIntent;
    session.cart_items.clear();
    session.service_queue.clear();
    session.service_details.clear();
    session.current_service = None;
    session.pending_cart_action = None;
    session.pending_estimate = None;
    session.user_intent = None;
}

fn is_finalize_request(utterance: &str) -> bool {
    let lowered = utterance.trim().to_ascii_lowercase();
    if FINALIZE_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return true;
    }
    lowered
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .any(|token| matches!(token, "done" | "finalize" | "submit" | "checkout" | "ready"))
}

fn fallback_answer() -> String {
    "Happy to help with that. I can also put together a price estimate - just tell me which \
     service you need."
        .to_string()
}

fn cart_summary(session: &ConversationSession) -> String {
    if session.cart_items.is_empty() {
        return "Your cart is empty.".to_string();
    }

    let entries: Vec<String> = session
        .cart_items
        .iter()
        .map(|item| format!("{} ({})", item.service_name, format_dollars(item.estimated_price)))
        .collect();
    let total: Decimal = session.cart_items.iter().map(|item| item.estimated_price).sum();
    format!(
        "Your cart: {} - {} service{}, estimated total {}.",
        entries.join(", "),
        session.cart_items.len(),
        if session.cart_items.len() == 1 { "" } else { "s" },
        format_dollars(total)
    )
}

fn render_view(session: &ConversationSession, request: ViewRequest) -> String {
    if session.cart_items.is_empty() {
        return "Your cart is empty. Tell me which service you need and we'll build a quote."
            .to_string();
    }

    match request {
        ViewRequest::Total => {
            let total: Decimal = session.cart_items.iter().map(|item| item.estimated_price).sum();
            format!(
                "Your estimated total for {} service{} is {}.",
                session.cart_items.len(),
                if session.cart_items.len() == 1 { "" } else { "s" },
                format_dollars(total)
            )
        }
        ViewRequest::Summary => cart_summary(session),
        ViewRequest::Detailed => {
            let mut lines = vec!["Here's everything in your cart:".to_string()];
            for item in &session.cart_items {
                lines.push(format!(
                    "- {} ({})",
                    item.service_name,
                    format_dollars(item.estimated_price)
                ));
                for (key, detail) in &item.collected_details {
                    lines.push(format!("    {}: {}", key.replace('_', " "), detail.value));
                }
            }
            lines.join("\n")
        }
    }
}
