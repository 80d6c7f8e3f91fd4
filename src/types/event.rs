//! The canonical event record and its conflict annotation.
//!
//! Every webhook, whatever its shape, is normalized into an [`Event`]. Events
//! are immutable once created; the wire form (JSON) is what gets stored in the
//! recent window and published on the fan-out channel.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{EventId, Timestamp};

/// Normalized event kind.
///
/// Serialized as a plain string. Unrecognized source kinds pass through as
/// [`EventType::Other`] with their original name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Push,
    PullRequest,
    /// A pull request that was closed with its changes merged.
    Merge,
    BranchCreate,
    BranchDelete,
    Issues,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Push => "push",
            EventType::PullRequest => "pull_request",
            EventType::Merge => "merge",
            EventType::BranchCreate => "branch_create",
            EventType::BranchDelete => "branch_delete",
            EventType::Issues => "issues",
            EventType::Other(name) => name,
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, EventType::Push)
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "push" => EventType::Push,
            "pull_request" => EventType::PullRequest,
            "merge" => EventType::Merge,
            "branch_create" => EventType::BranchCreate,
            "branch_delete" => EventType::BranchDelete,
            "issues" => EventType::Issues,
            _ => EventType::Other(s),
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        EventType::from(s.to_string())
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflict alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    /// Files at or above this count make an alert high severity.
    pub const HIGH_THRESHOLD: usize = 3;

    pub fn for_file_count(count: usize) -> Self {
        if count >= Self::HIGH_THRESHOLD {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

fn conflict_risk() -> String {
    ConflictAlert::KIND.to_string()
}

/// Flags that two branches touched overlapping files within the trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictAlert {
    /// Alert kind tag, always `conflict_risk`.
    #[serde(rename = "type", default = "conflict_risk")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    /// The new event's branch first, then the conflicting branches sorted.
    pub branches: Vec<String>,
    /// Sorted, de-duplicated overlapping paths.
    pub conflicting_files: Vec<String>,
}

impl ConflictAlert {
    pub const KIND: &'static str = "conflict_risk";
}

/// A normalized source-control event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub event_type: EventType,
    pub actor: String,
    #[serde(default)]
    pub actor_avatar: String,
    pub repository: String,
    #[serde(default)]
    pub branch: String,
    pub title: String,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    /// Sorted and duplicate-free. Only populated for push events.
    #[serde(default)]
    pub files_changed: Vec<String>,
    #[serde(default)]
    pub alert: Option<ConflictAlert>,
}

impl Event {
    /// Returns true if this event carries a conflict alert.
    pub fn has_alert(&self) -> bool {
        self.alert.is_some()
    }

    /// Serializes the event to its JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses an event from its JSON wire form.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
