//! Confirmed cart mutations. Every destructive or two-turn operation is
//! gated by a pending cart action recorded on the session; nothing mutates
//! a cart item without one.

use homequote_core::domain::session::{
    CartAction, ConversationSession, DetailSource, PendingCartAction, ServiceId,
};
use homequote_core::errors::DomainError;
use homequote_core::pricing;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Positive,
    Negative,
    Unclear,
}

/// Negative markers are checked first so "don't remove it" reads as a no.
const NEGATIVE_MARKERS: &[&str] = &[
    "no", "nope", "nah", "don't", "dont", "keep", "leave it", "never mind", "nevermind", "stop",
    "cancel that", "wait",
];

const POSITIVE_MARKERS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "sure", "confirm", "correct", "right", "ok", "okay", "go ahead",
    "do it", "please do", "absolutely",
];

pub fn classify_confirmation(text: &str) -> Confirmation {
    let lowered = text.trim().to_ascii_lowercase();
    if NEGATIVE_MARKERS.iter().any(|marker| contains_marker(&lowered, marker)) {
        return Confirmation::Negative;
    }
    if POSITIVE_MARKERS.iter().any(|marker| contains_marker(&lowered, marker)) {
        return Confirmation::Positive;
    }
    Confirmation::Unclear
}

fn contains_marker(lowered: &str, marker: &str) -> bool {
    if marker.contains(' ') {
        return lowered.contains(marker);
    }
    lowered.split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '\'').any(|token| token == marker)
}

/// Records the pending removal and returns the confirmation question.
pub fn stage_removal(session: &mut ConversationSession, item_index: usize) -> Result<String, DomainError> {
    let item = session.cart_items.get(item_index).ok_or_else(|| DomainError::CartItemNotFound {
        reference: format!("index {item_index}"),
    })?;

    let service_name = item.service_name.clone();
    session.pending_cart_action = Some(PendingCartAction {
        action: CartAction::Remove,
        target_service_id: item.service_id.clone(),
        target_service_name: service_name.clone(),
        item_index,
        field_to_edit: None,
    });

    Ok(format!("Just to confirm: remove {service_name} from your cart? (yes/no)"))
}

#[derive(Clone, Debug, PartialEq)]
pub enum RemovalOutcome {
    Removed { service_name: String, remaining: usize },
    Declined,
    Unclear,
    /// The pending action no longer matches the cart (or was never staged).
    Stale,
}

/// Treats `text` as the removal confirmation only when the pending action is
/// a removal whose target still matches the cart.
pub fn confirm_removal(session: &mut ConversationSession, text: &str) -> RemovalOutcome {
    let Some(pending) = session.pending_cart_action.clone() else {
        return RemovalOutcome::Stale;
    };
    if pending.action != CartAction::Remove || !target_matches(session, &pending) {
        session.pending_cart_action = None;
        return RemovalOutcome::Stale;
    }

    match classify_confirmation(text) {
        Confirmation::Negative => {
            session.pending_cart_action = None;
            RemovalOutcome::Declined
        }
        Confirmation::Positive => {
            let removed = session.cart_items.remove(pending.item_index);
            session.pending_cart_action = None;
            RemovalOutcome::Removed {
                service_name: removed.service_name,
                remaining: session.cart_items.len(),
            }
        }
        Confirmation::Unclear => RemovalOutcome::Unclear,
    }
}

/// Records a pending edit and asks for the new value, mentioning the current
/// one when present.
pub fn stage_edit(
    session: &mut ConversationSession,
    item_index: usize,
    field: &str,
) -> Result<String, DomainError> {
    let item = session.cart_items.get(item_index).ok_or_else(|| DomainError::CartItemNotFound {
        reference: format!("index {item_index}"),
    })?;

    let service_name = item.service_name.clone();
    let current = item.detail(field).map(str::to_string);
    session.pending_cart_action = Some(PendingCartAction {
        action: CartAction::Edit,
        target_service_id: item.service_id.clone(),
        target_service_name: service_name.clone(),
        item_index,
        field_to_edit: Some(field.to_string()),
    });

    let field_label = field.replace('_', " ");
    Ok(match current {
        Some(current) => format!(
            "Sure - the {field_label} for {service_name} is currently \"{current}\". What should it be instead?"
        ),
        None => format!("Sure - what should the {field_label} for {service_name} be?"),
    })
}

/// Writes the new value onto the target cart item and reprices it. The
/// session-wide detail is updated through the explicit-edit path too, so the
/// next assembly sees the corrected value.
pub fn apply_edit(
    session: &mut ConversationSession,
    item_index: usize,
    field: &str,
    new_value: &str,
) -> Result<String, DomainError> {
    let trimmed = new_value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "replacement value is empty"));
    }
    if session.cart_items.get(item_index).is_none() {
        return Err(DomainError::CartItemNotFound { reference: format!("index {item_index}") });
    }

    let detail = session.detail_value(trimmed, DetailSource::CartEdit);
    session.overwrite_detail(field, detail.clone());

    let item = &mut session.cart_items[item_index];
    item.collected_details.insert(field.to_string(), detail);
    item.estimated_price = pricing::adjusted_price(&item.service_name, &item.collected_details);

    let service_name = item.service_name.clone();
    session.pending_cart_action = None;

    Ok(format!(
        "Done - {} for {service_name} is now \"{trimmed}\".",
        field.replace('_', " ")
    ))
}

fn target_matches(session: &ConversationSession, pending: &PendingCartAction) -> bool {
    item_id_at(session, pending.item_index)
        .map(|id| *id == pending.target_service_id)
        .unwrap_or(false)
}

fn item_id_at(session: &ConversationSession, index: usize) -> Option<&ServiceId> {
    session.cart_items.get(index).map(|item| &item.service_id)
}
