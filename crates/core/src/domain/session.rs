use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::CartItem;
use crate::domain::estimate::EstimateResult;
use crate::domain::lead::LeadData;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingUserIntent,
    GatheringDetails,
    AwaitingCartConfirmation,
    AwaitingCartRemovalConfirmation,
    AwaitingCartEditValue,
    AwaitingCartClarification,
    CartComplete,
    AwaitingLeadDetails { step: LeadStep },
    QuoteCompleted,
    ErrorRecovery,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStep {
    Name,
    Email,
    Phone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIntent {
    QuestionAnswering,
    QuoteBuilding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailSource {
    UserInput,
    DetailGathering,
    InitialConversation,
    CartEdit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailValue {
    pub value: String,
    pub source: DetailSource,
    pub collected_at: DateTime<Utc>,
    pub session_id: SessionId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuedServiceStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedService {
    pub id: ServiceId,
    pub name: String,
    pub status: QueuedServiceStatus,
    pub added_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveService {
    pub id: ServiceId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerServiceDetails {
    pub service_id: ServiceId,
    pub service_name: String,
    pub collected_details: BTreeMap<String, DetailValue>,
    pub is_complete: bool,
}

impl PerServiceDetails {
    pub fn new(service_id: ServiceId, service_name: impl Into<String>) -> Self {
        Self {
            service_id,
            service_name: service_name.into(),
            collected_details: BTreeMap::new(),
            is_complete: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    Remove,
    Edit,
}

/// Session-scoped marker gating a destructive or two-turn cart mutation.
/// Created when the mutation is first requested, cleared on resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCartAction {
    pub action: CartAction,
    pub target_service_id: ServiceId,
    pub target_service_name: String,
    pub item_index: usize,
    pub field_to_edit: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: SessionId,
    pub business_id: BusinessId,
    pub state: SessionState,
    pub messages: Vec<ChatMessage>,
    pub user_intent: Option<UserIntent>,
    pub lead_data: LeadData,
    pub service_queue: Vec<QueuedService>,
    pub current_service: Option<ActiveService>,
    pub service_details: BTreeMap<String, PerServiceDetails>,
    pub collected_details: BTreeMap<String, DetailValue>,
    pub cart_items: Vec<CartItem>,
    pub pending_cart_action: Option<PendingCartAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_estimate: Option<EstimateResult>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(business_id: BusinessId) -> Self {
        Self {
            id: SessionId(Uuid::new_v4().to_string()),
            business_id,
            state: SessionState::AwaitingUserIntent,
            messages: Vec::new(),
            user_intent: None,
            lead_data: LeadData::default(),
            service_queue: Vec::new(),
            current_service: None,
            service_details: BTreeMap::new(),
            collected_details: BTreeMap::new(),
            cart_items: Vec::new(),
            pending_cart_action: None,
            pending_estimate: None,
            last_activity: Utc::now(),
        }
    }

    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(ChatMessage { role, content: content.into(), at: Utc::now() });
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn detail(&self, key: &str) -> Option<&DetailValue> {
        self.collected_details.get(key)
    }

    /// Records a detail only if the key has not been collected yet. Keys are
    /// unique per session and reused across services; an existing value is
    /// never silently replaced.
    pub fn record_detail(&mut self, key: impl Into<String>, value: DetailValue) -> bool {
        let key = key.into();
        if self.collected_details.contains_key(&key) {
            return false;
        }
        self.collected_details.insert(key, value);
        true
    }

    /// Explicit-edit write path: replaces whatever is stored under `key`.
    pub fn overwrite_detail(&mut self, key: impl Into<String>, value: DetailValue) {
        self.collected_details.insert(key.into(), value);
    }

    pub fn detail_value(&self, value: impl Into<String>, source: DetailSource) -> DetailValue {
        DetailValue {
            value: value.into(),
            source,
            collected_at: Utc::now(),
            session_id: self.id.clone(),
        }
    }
}
