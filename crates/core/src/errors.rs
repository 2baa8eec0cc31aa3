use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("no cart item matches `{reference}`")]
    CartItemNotFound { reference: String },
    #[error("no service is currently being gathered")]
    NoActiveService,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), reason: reason.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("collaborator `{name}` unavailable: {reason}")]
    CollaboratorUnavailable { name: String, reason: String },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn collaborator(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable { name: name.into(), reason: reason.into() }
    }

    /// Customer-safe rendering. Internal detail stays in the server-side log;
    /// nothing from the underlying error reaches the reply text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::Validation { .. }) => {
                "That doesn't look quite right. Could you try again?"
            }
            Self::Domain(DomainError::CartItemNotFound { .. }) => {
                "I couldn't find that item in your cart."
            }
            Self::Domain(_) => "Something went wrong on our side. Let's pick up where we left off.",
            Self::CollaboratorUnavailable { .. } | Self::Persistence(_) => {
                "I'm having trouble reaching part of our system. Please try again in a moment."
            }
            Self::Configuration(_) => "Something went wrong on our side. Please try again shortly.",
        }
    }
}
