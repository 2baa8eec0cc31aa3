use serde::{Deserialize, Serialize};

use crate::domain::session::ServiceId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RequirementKind {
    Text,
    Number,
    Select { options: Vec<String> },
}

/// One slot a service needs collected before it can enter the cart.
/// Requirement order is the order questions are asked in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub key: String,
    pub prompt: String,
    pub required: bool,
    #[serde(flatten)]
    pub kind: RequirementKind,
}

impl Requirement {
    pub fn required_text(key: &str, prompt: &str) -> Self {
        Self {
            key: key.to_string(),
            prompt: prompt.to_string(),
            required: true,
            kind: RequirementKind::Text,
        }
    }

    pub fn optional_text(key: &str, prompt: &str) -> Self {
        Self {
            key: key.to_string(),
            prompt: prompt.to_string(),
            required: false,
            kind: RequirementKind::Text,
        }
    }

    pub fn required_select(key: &str, prompt: &str, options: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            prompt: prompt.to_string(),
            required: true,
            kind: RequirementKind::Select {
                options: options.iter().map(|option| option.to_string()).collect(),
            },
        }
    }
}
