//! Slot-filling driver for the current service. The currently-asked
//! requirement is recomputed fresh on every call (first missing required,
//! else first missing optional) and never stored, so out-of-order answers
//! are tolerated. A key collected once is never asked again for any service
//! in the session.

use homequote_core::domain::catalog::Requirement;
use homequote_core::domain::session::{ConversationSession, DetailSource, PerServiceDetails};
use homequote_core::errors::DomainError;

use crate::extract;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatherOutcome {
    pub reply: String,
    pub completed: bool,
}

pub fn process(
    session: &mut ConversationSession,
    requirements: &[Requirement],
    utterance: Option<&str>,
) -> Result<GatherOutcome, DomainError> {
    let active = session.current_service.clone().ok_or(DomainError::NoActiveService)?;

    let first_contact = !session.service_details.contains_key(&active.id.0);
    session
        .service_details
        .entry(active.id.0.clone())
        .or_insert_with(|| PerServiceDetails::new(active.id.clone(), active.name.clone()));

    // Requirement-free services complete immediately.
    if requirements.is_empty() {
        mark_complete(session, &active.id.0);
        return Ok(GatherOutcome { reply: completion_summary(session, &active.name, requirements), completed: true });
    }

    if let Some(text) = utterance {
        if let Some(asked) = next_missing(session, requirements) {
            let asked = asked.clone();
            let extracted = extract::extract(text, Some(&asked));
            for (key, value) in extracted {
                let detail = session.detail_value(value, DetailSource::DetailGathering);
                let recorded = session.record_detail(key.clone(), detail.clone());
                let is_service_key =
                    requirements.iter().any(|requirement| requirement.key == key);
                if recorded && is_service_key {
                    if let Some(per_service) = session.service_details.get_mut(&active.id.0) {
                        per_service.collected_details.insert(key, detail);
                    }
                }
            }
        }
    }

    if is_complete(session, requirements) {
        mark_complete(session, &active.id.0);
        return Ok(GatherOutcome {
            reply: completion_summary(session, &active.name, requirements),
            completed: true,
        });
    }

    let next = next_missing(session, requirements)
        .ok_or_else(|| DomainError::InvariantViolation("incomplete service with no missing requirement".to_string()))?;

    let mut reply = String::new();
    if first_contact {
        reply.push_str(&format!("Let's get a few details for {}. ", active.name));
    }
    reply.push_str(&next.prompt);

    let missing_required = missing_required(session, requirements);
    if missing_required.len() > 1 {
        reply.push_str(&format!(" (question 1 of {} required details)", missing_required.len()));
    }

    Ok(GatherOutcome { reply, completed: false })
}

/// Every `required` requirement has a collected value.
pub fn is_complete(session: &ConversationSession, requirements: &[Requirement]) -> bool {
    requirements
        .iter()
        .filter(|requirement| requirement.required)
        .all(|requirement| session.collected_details.contains_key(&requirement.key))
}

pub fn missing_required<'a>(
    session: &ConversationSession,
    requirements: &'a [Requirement],
) -> Vec<&'a Requirement> {
    requirements
        .iter()
        .filter(|requirement| {
            requirement.required && !session.collected_details.contains_key(&requirement.key)
        })
        .collect()
}

fn next_missing<'a>(
    session: &ConversationSession,
    requirements: &'a [Requirement],
) -> Option<&'a Requirement> {
    let first_missing = |required: bool| {
        requirements.iter().find(|requirement| {
            requirement.required == required
                && !session.collected_details.contains_key(&requirement.key)
        })
    };
    first_missing(true).or_else(|| first_missing(false))
}

fn mark_complete(session: &mut ConversationSession, service_key: &str) {
    if let Some(per_service) = session.service_details.get_mut(service_key) {
        per_service.is_complete = true;
    }
}

/// Service name plus up to three collected "field: value" pairs, ending in a
/// yes/no add-to-cart question.
fn completion_summary(
    session: &ConversationSession,
    service_name: &str,
    requirements: &[Requirement],
) -> String {
    let pairs: Vec<String> = requirements
        .iter()
        .filter_map(|requirement| {
            session
                .collected_details
                .get(&requirement.key)
                .map(|detail| format!("{}: {}", requirement.key.replace('_', " "), detail.value))
        })
        .take(3)
        .collect();

    let recap = match pairs.len() {
        0 => String::new(),
        1 => format!(" with {}", pairs[0]),
        _ => {
            let (last, rest) = pairs.split_last().expect("len > 1");
            format!(" with {} and {}", rest.join(", "), last)
        }
    };

    format!("Got everything I need for {service_name}{recap}. Should I add it to your cart? (yes/no)")
}
