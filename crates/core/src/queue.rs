//! Ordered per-session service queue. Queue order is insertion order; at
//! most one entry is in progress at any time.

use chrono::Utc;

use crate::domain::catalog::Service;
use crate::domain::session::{
    ActiveService, ConversationSession, QueuedService, QueuedServiceStatus,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl QueueStatus {
    pub fn has_more(&self) -> bool {
        self.pending > 0
    }
}

/// Appends services not already queued (dedup by id). Returns how many were
/// actually added, so `enqueue(enqueue(s, l), l)` leaves the queue length
/// unchanged.
pub fn enqueue(session: &mut ConversationSession, services: &[Service]) -> usize {
    let mut added = 0;
    for service in services {
        let already_queued = session.service_queue.iter().any(|entry| entry.id == service.id);
        if already_queued {
            continue;
        }
        session.service_queue.push(QueuedService {
            id: service.id.clone(),
            name: service.name.clone(),
            status: QueuedServiceStatus::Pending,
            added_at: Utc::now(),
            started_at: None,
            completed_at: None,
        });
        added += 1;
    }
    added
}

/// Marks the first pending entry in progress (FIFO) and makes it the current
/// service. If a service is already in progress it is returned unchanged, so
/// the single-active invariant holds no matter how often this is called.
pub fn start_next(session: &mut ConversationSession) -> Option<ActiveService> {
    if let Some(active) = &session.current_service {
        return Some(active.clone());
    }

    let entry = session
        .service_queue
        .iter_mut()
        .find(|entry| entry.status == QueuedServiceStatus::Pending)?;
    entry.status = QueuedServiceStatus::InProgress;
    entry.started_at = Some(Utc::now());

    let active = ActiveService { id: entry.id.clone(), name: entry.name.clone() };
    session.current_service = Some(active.clone());
    Some(active)
}

/// Marks the current service completed and clears it. Returns the completed
/// entry's id, or None when nothing was in progress.
pub fn complete_current(session: &mut ConversationSession) -> Option<ActiveService> {
    let active = session.current_service.take()?;
    if let Some(entry) = session.service_queue.iter_mut().find(|entry| entry.id == active.id) {
        entry.status = QueuedServiceStatus::Completed;
        entry.completed_at = Some(Utc::now());
    }
    Some(active)
}

pub fn status(session: &ConversationSession) -> QueueStatus {
    let mut counts = QueueStatus { pending: 0, in_progress: 0, completed: 0 };
    for entry in &session.service_queue {
        match entry.status {
            QueuedServiceStatus::Pending => counts.pending += 1,
            QueuedServiceStatus::InProgress => counts.in_progress += 1,
            QueuedServiceStatus::Completed => counts.completed += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use crate::domain::catalog::Service;
    use crate::domain::session::{
        BusinessId, ConversationSession, QueuedServiceStatus, ServiceId,
    };

    use super::{complete_current, enqueue, start_next, status};

    fn service(id: &str, name: &str) -> Service {
        Service { id: ServiceId(id.to_string()), name: name.to_string(), description: None }
    }

    fn session() -> ConversationSession {
        ConversationSession::new(BusinessId("biz-1".to_string()))
    }

    #[test]
    fn enqueue_is_idempotent_by_service_id() {
        let mut session = session();
        let services = vec![service("hvac", "HVAC Services"), service("lawn", "Lawn Mowing")];

        assert_eq!(enqueue(&mut session, &services), 2);
        assert_eq!(enqueue(&mut session, &services), 0);
        assert_eq!(session.service_queue.len(), 2);
    }

    #[test]
    fn start_next_is_fifo_and_sets_current() {
        let mut session = session();
        enqueue(&mut session, &[service("hvac", "HVAC Services"), service("lawn", "Lawn Mowing")]);

        let active = start_next(&mut session).expect("first pending starts");
        assert_eq!(active.id.0, "hvac");
        assert_eq!(session.current_service.as_ref().map(|a| a.id.0.as_str()), Some("hvac"));
        assert_eq!(session.service_queue[0].status, QueuedServiceStatus::InProgress);
    }

    #[test]
    fn at_most_one_service_is_in_progress() {
        let mut session = session();
        enqueue(&mut session, &[service("hvac", "HVAC Services"), service("lawn", "Lawn Mowing")]);

        let first = start_next(&mut session).expect("starts hvac");
        let second = start_next(&mut session).expect("returns the active entry");
        assert_eq!(first, second);
        assert_eq!(status(&session).in_progress, 1);
    }

    #[test]
    fn complete_clears_current_and_advances() {
        let mut session = session();
        enqueue(&mut session, &[service("hvac", "HVAC Services"), service("lawn", "Lawn Mowing")]);
        start_next(&mut session);

        let completed = complete_current(&mut session).expect("hvac completes");
        assert_eq!(completed.id.0, "hvac");
        assert!(session.current_service.is_none());

        let counts = status(&session);
        assert_eq!((counts.pending, counts.in_progress, counts.completed), (1, 0, 1));
        assert!(counts.has_more());

        let next = start_next(&mut session).expect("lawn starts");
        assert_eq!(next.id.0, "lawn");
    }

    #[test]
    fn complete_without_active_service_is_a_noop() {
        let mut session = session();
        enqueue(&mut session, &[service("hvac", "HVAC Services")]);
        assert!(complete_current(&mut session).is_none());
        assert_eq!(status(&session).pending, 1);
    }
}
