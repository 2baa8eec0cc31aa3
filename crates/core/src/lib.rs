pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod queue;
pub mod stores;

pub use domain::cart::{format_dollars, format_range, CartItem, PriceRange};
pub use domain::catalog::{Requirement, RequirementKind, Service};
pub use domain::estimate::{EstimateLineItem, EstimateResult, EstimateSource};
pub use domain::lead::{LeadData, LeadId};
pub use domain::quote::{QuoteRequest, QuoteRequestId, QuoteRequestStatus};
pub use domain::session::{
    ActiveService, BusinessId, CartAction, ChatMessage, ConversationSession, DetailSource,
    DetailValue, LeadStep, MessageRole, PendingCartAction, PerServiceDetails, QueuedService,
    QueuedServiceStatus, ServiceId, SessionId, SessionState, UserIntent,
};
pub use errors::{ApplicationError, DomainError};
pub use queue::QueueStatus;
pub use stores::{LeadStore, QuoteReceipt, ServiceCatalog, SessionStore, StoreError};
