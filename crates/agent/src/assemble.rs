//! Turns the completed current service into a priced cart item and advances
//! the queue.

use chrono::Utc;

use homequote_core::domain::cart::CartItem;
use homequote_core::domain::session::ConversationSession;
use homequote_core::errors::DomainError;
use homequote_core::{pricing, queue};

#[derive(Clone, Debug, PartialEq)]
pub struct AssembleOutcome {
    pub item_index: usize,
    pub more_services: bool,
}

/// Session-wide details form the base; the per-service overlay wins on key
/// conflicts. The service is marked completed and leaves the active queue.
pub fn add_current_service_to_cart(
    session: &mut ConversationSession,
) -> Result<AssembleOutcome, DomainError> {
    let active = session.current_service.clone().ok_or(DomainError::NoActiveService)?;

    let mut merged = session.collected_details.clone();
    if let Some(per_service) = session.service_details.get(&active.id.0) {
        for (key, detail) in &per_service.collected_details {
            merged.insert(key.clone(), detail.clone());
        }
    }

    let estimated_price = pricing::adjusted_price(&active.name, &merged);

    session.cart_items.push(CartItem {
        service_id: active.id.clone(),
        service_name: active.name.clone(),
        collected_details: merged,
        estimated_price,
        added_at: Utc::now(),
    });
    queue::complete_current(session);

    Ok(AssembleOutcome {
        item_index: session.cart_items.len() - 1,
        more_services: queue::status(session).has_more(),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use homequote_core::domain::catalog::Service;
    use homequote_core::domain::session::{
        BusinessId, ConversationSession, DetailSource, PerServiceDetails, ServiceId,
    };
    use homequote_core::queue;

    use super::add_current_service_to_cart;

    fn service(id: &str, name: &str) -> Service {
        Service { id: ServiceId(id.to_string()), name: name.to_string(), description: None }
    }

    fn session_with_started(services: &[Service]) -> ConversationSession {
        let mut session = ConversationSession::new(BusinessId("biz-1".to_string()));
        queue::enqueue(&mut session, services);
        queue::start_next(&mut session);
        session
    }

    #[test]
    fn per_service_overlay_wins_on_key_conflict() {
        let mut session = session_with_started(&[service("hvac", "HVAC Services")]);
        let base = session.detail_value("session-wide", DetailSource::InitialConversation);
        session.record_detail("description", base);

        let mut per_service = PerServiceDetails::new(
            ServiceId("hvac".to_string()),
            "HVAC Services",
        );
        let overlay = session.detail_value("per-service", DetailSource::DetailGathering);
        per_service.collected_details.insert("description".to_string(), overlay);
        session.service_details.insert("hvac".to_string(), per_service);

        let outcome = add_current_service_to_cart(&mut session).expect("assemble");
        let item = &session.cart_items[outcome.item_index];
        assert_eq!(item.detail("description"), Some("per-service"));
    }

    #[test]
    fn pricing_applies_detail_adjustments() {
        let mut session = session_with_started(&[service("hvac", "HVAC Services")]);
        let footage = session.detail_value("2400", DetailSource::DetailGathering);
        session.record_detail("square_footage", footage);

        add_current_service_to_cart(&mut session).expect("assemble");
        // 350 base x 1.2 square-footage adjustment
        assert_eq!(session.cart_items[0].estimated_price, Decimal::new(420, 0));
    }

    #[test]
    fn queue_advancement_reports_remaining_work() {
        let mut session = session_with_started(&[
            service("hvac", "HVAC Services"),
            service("lawn", "Lawn Mowing"),
        ]);

        let outcome = add_current_service_to_cart(&mut session).expect("assemble");
        assert!(outcome.more_services);
        assert!(session.current_service.is_none());
        assert_eq!(session.cart_items.len(), 1);

        queue::start_next(&mut session);
        let outcome = add_current_service_to_cart(&mut session).expect("assemble");
        assert!(!outcome.more_services);
        assert_eq!(session.cart_items.len(), 2);
    }

    #[test]
    fn assembling_without_an_active_service_fails() {
        let mut session = ConversationSession::new(BusinessId("biz-1".to_string()));
        assert!(add_current_service_to_cart(&mut session).is_err());
    }
}
