//! Group records and membership events.

use serde::{Deserialize, Serialize};

/// A group stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// A group opted in to receive reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedGroup {
    pub id: String,
    pub name: String,
}

/// Live view of a group as the transport reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

impl GroupSnapshot {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Subject trimmed and lower-cased, as used by the registry filter.
    pub fn normalized_subject(&self) -> String {
        self.subject.trim().to_lowercase()
    }
}

/// Membership change reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantAction {
    #[serde(alias = "join")]
    Add,
    #[serde(alias = "leave")]
    Remove,
    Promote,
    Demote,
    #[serde(other)]
    Unknown,
}

/// A join/leave notification. Consumed once by the event processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEvent {
    #[serde(rename = "id")]
    pub group_id: String,
    pub action: ParticipantAction,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl MembershipEvent {
    pub fn new(group_id: impl Into<String>, action: ParticipantAction, participants: Vec<String>) -> Self {
        Self {
            group_id: group_id.into(),
            action,
            participants,
            timestamp: chrono::Utc::now(),
        }
    }
}
