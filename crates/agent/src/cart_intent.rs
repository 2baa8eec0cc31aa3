//! Heuristic classification of cart-mutation intent from free text. Rules
//! run in priority order and the first match wins. Single-turn regexless
//! parsing: "change X for Y" style phrasings can mis-split the field name
//! and the target service on ambiguous input; that limit is inherent to
//! this classifier and deliberately not papered over.

use homequote_core::domain::cart::CartItem;
use homequote_core::domain::session::ServiceId;

use crate::matcher;

/// Canonical field key to accepted phrasings. Lookup is total and
/// order-independent within a key; the longest matching synonym wins, so
/// "square footage" beats "footage".
pub const FIELD_SYNONYMS: &[(&str, &[&str])] = &[
    ("square_footage", &["square footage", "square feet", "sq ft", "sqft", "footage"]),
    ("system_type", &["system type", "type of system", "system"]),
    ("issue_type", &["issue type", "issue", "problem"]),
    ("kitchen_size", &["kitchen size", "size of the kitchen"]),
    ("budget_range", &["budget range", "budget", "price range"]),
    ("urgency", &["urgency", "timeline", "how soon"]),
    ("description", &["description", "details", "notes"]),
    ("address", &["address", "location"]),
];

const REMOVAL_PHRASES: &[&str] = &[
    "get rid of", "don't want", "dont want", "take out", "remove", "delete", "drop", "cancel",
    "skip",
];

const EDIT_VERBS: &[&str] = &["change", "update", "edit", "modify"];

const VIEW_PHRASES: &[&str] =
    &["show", "what's in", "whats in", "review", "what services", "total cost", "view my cart"];

const CART_KEYWORDS: &[&str] = &[
    "cart", "remove", "delete", "edit", "change", "update", "modify", "view", "show", "review",
    "total", "cost", "price", "item", "service", "get rid", "take out", "drop", "cancel",
    "don't want", "dont want", "skip", "what's in", "whats in", "should be",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewRequest {
    Total,
    Detailed,
    Summary,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartIntent {
    Remove {
        item_index: usize,
        service_id: ServiceId,
        service_name: String,
        requires_confirmation: bool,
    },
    Edit {
        item_index: usize,
        service_id: ServiceId,
        service_name: String,
        field: String,
        new_value: Option<String>,
    },
    View {
        request: ViewRequest,
    },
    Unclear {
        suggestion: String,
    },
    NonCartRelated,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedCartIntent {
    pub intent: CartIntent,
    pub confidence: u8,
}

pub fn classify(text: &str, items: &[CartItem]) -> ClassifiedCartIntent {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();

    // Rule 1: no cart-related keyword at all.
    if !CART_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
        return ClassifiedCartIntent { intent: CartIntent::NonCartRelated, confidence: 95 };
    }

    // Rule 2: removal phrasing with a resolvable trailing phrase.
    if let Some(intent) = classify_removal(&lowered, items) {
        return ClassifiedCartIntent { intent, confidence: 85 };
    }

    // Rule 3: edit phrasing.
    if let Some((intent, confidence)) = classify_edit(trimmed, &lowered, items) {
        return ClassifiedCartIntent { intent, confidence };
    }

    // Rule 4: view phrasing.
    if let Some(request) = classify_view(&lowered) {
        return ClassifiedCartIntent { intent: CartIntent::View { request }, confidence: 90 };
    }

    // Rule 5: cart-ish but unresolvable.
    ClassifiedCartIntent {
        intent: CartIntent::Unclear {
            suggestion: "You can say things like \"remove the lawn mowing\", \"change the \
                         address\", or \"show my cart\"."
                .to_string(),
        },
        confidence: 30,
    }
}

fn classify_removal(lowered: &str, items: &[CartItem]) -> Option<CartIntent> {
    for phrase in REMOVAL_PHRASES {
        let Some(position) = lowered.find(phrase) else {
            continue;
        };
        let trailing = strip_leading_articles(&lowered[position + phrase.len()..]);
        if trailing.is_empty() {
            continue;
        }
        if let Some((item_index, item)) = matcher::match_cart_item(trailing, items) {
            return Some(CartIntent::Remove {
                item_index,
                service_id: item.service_id.clone(),
                service_name: item.service_name.clone(),
                requires_confirmation: true,
            });
        }
        // Unmatched trailing phrase falls through to the later rules.
    }
    None
}

fn classify_edit(trimmed: &str, lowered: &str, items: &[CartItem]) -> Option<(CartIntent, u8)> {
    let field = lookup_field(lowered)?;

    let has_edit_verb = EDIT_VERBS.iter().any(|verb| lowered.contains(verb));
    let should_be = lowered.find(" should be ");
    if !has_edit_verb && should_be.is_none() {
        return None;
    }

    // "... to <value>" or "X should be <value>" carries the new value in the
    // same utterance. Offsets computed on the lowered text index into the
    // original so the value keeps its casing.
    let new_value = should_be
        .map(|position| trimmed[position + " should be ".len()..].trim().to_string())
        .or_else(|| {
            let field_position = position_of_field(lowered, field)?;
            let after_field = &lowered[field_position..];
            after_field.find(" to ").map(|position| {
                trimmed[field_position + position + 4..].trim().to_string()
            })
        })
        .filter(|value| !value.is_empty());

    // Explicit target ("... for/in/on the hvac"), else the single-item
    // fallback inside the matcher.
    let target_text = [" for ", " in ", " on "]
        .iter()
        .filter_map(|connector| lowered.rfind(connector).map(|pos| &lowered[pos + connector.len()..]))
        .next()
        .unwrap_or(lowered);

    let (item_index, item) = matcher::resolve_target(target_text, items)?;
    let confidence = if matcher::match_cart_item(target_text, items).is_some() { 80 } else { 70 };

    Some((
        CartIntent::Edit {
            item_index,
            service_id: item.service_id.clone(),
            service_name: item.service_name.clone(),
            field: field.to_string(),
            new_value,
        },
        confidence,
    ))
}

fn classify_view(lowered: &str) -> Option<ViewRequest> {
    if !VIEW_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return None;
    }
    if ["total", "cost", "price"].iter().any(|word| lowered.contains(word)) {
        return Some(ViewRequest::Total);
    }
    if lowered.contains("review") || lowered.contains("detail") {
        return Some(ViewRequest::Detailed);
    }
    Some(ViewRequest::Summary)
}

/// Bidirectional synonym lookup: the longest synonym found anywhere in the
/// text selects its canonical key.
pub fn lookup_field(text: &str) -> Option<&'static str> {
    let lowered = text.to_ascii_lowercase();
    let mut best: Option<(&'static str, usize)> = None;
    for (canonical, synonyms) in FIELD_SYNONYMS {
        for synonym in *synonyms {
            if lowered.contains(synonym) {
                let better = best.map(|(_, length)| synonym.len() > length).unwrap_or(true);
                if better {
                    best = Some((canonical, synonym.len()));
                }
            }
        }
    }
    best.map(|(canonical, _)| canonical)
}

fn position_of_field(lowered: &str, field: &str) -> Option<usize> {
    let (_, synonyms) = FIELD_SYNONYMS.iter().find(|(canonical, _)| *canonical == field)?;
    synonyms.iter().filter_map(|synonym| lowered.find(synonym)).min()
}

fn strip_leading_articles(text: &str) -> &str {
    let mut rest = text.trim();
    for article in ["the ", "my ", "that ", "this ", "a ", "an "] {
        if let Some(stripped) = rest.strip_prefix(article) {
            rest = stripped.trim_start();
        }
    }
    rest
}
