use serde::{Deserialize, Serialize};

use crate::domain::session::LeadStep;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Contact details captured during quote finalization. Complete once all
/// three fields hold a non-empty value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadData {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl LeadData {
    pub fn is_complete(&self) -> bool {
        self.next_missing().is_none()
    }

    pub fn next_missing(&self) -> Option<LeadStep> {
        if filled(&self.name).is_none() {
            return Some(LeadStep::Name);
        }
        if filled(&self.email).is_none() {
            return Some(LeadStep::Email);
        }
        if filled(&self.phone).is_none() {
            return Some(LeadStep::Phone);
        }
        None
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
