//! Normalization of raw webhook payloads into canonical [`Event`]s.
//!
//! # Strategy
//!
//! 1. The event kind comes from the `X-GitHub-Event` header
//! 2. Common fields (actor, avatar, repository) are read from every payload
//! 3. Kind-specific fields (branch, files, details) are read per kind
//! 4. Unknown kinds pass through with no details
//!
//! Normalization never fails. Every missing or mistyped field degrades to a
//! default, so any JSON value yields an event.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::types::{Event, EventId, EventType, Timestamp};

use super::payload::{Payload, short_ref};
use super::title::generate_title;

/// Normalizes a raw payload of kind `event_kind` into an [`Event`].
///
/// The id and timestamp are generated fresh at call time.
///
/// # Examples
///
/// ```
/// use collab_monitor::types::EventType;
/// use collab_monitor::webhooks::normalize;
///
/// let payload = serde_json::json!({
///     "ref": "refs/heads/main",
///     "pusher": { "name": "octocat" },
///     "commits": [{ "added": ["README.md"] }],
///     "sender": { "login": "octocat" },
///     "repository": { "full_name": "octocat/hello-world" }
/// });
///
/// let event = normalize("push", &payload);
/// assert_eq!(event.event_type, EventType::Push);
/// assert_eq!(event.branch, "main");
/// assert_eq!(event.files_changed, vec!["README.md"]);
/// ```
pub fn normalize(event_kind: &str, payload: &Value) -> Event {
    let p = Payload::new(payload);

    let mut event = Event {
        id: EventId::generate(),
        timestamp: Timestamp::now(),
        event_type: EventType::from(event_kind),
        actor: p.str_or(&["sender", "login"], "unknown").to_string(),
        actor_avatar: p.str_or(&["sender", "avatar_url"], "").to_string(),
        repository: p
            .str_or(&["repository", "full_name"], "unknown/unknown")
            .to_string(),
        branch: String::new(),
        title: generate_title(event_kind, p),
        details: Map::new(),
        files_changed: Vec::new(),
        alert: None,
    };

    match event_kind {
        "push" => {
            event.branch = short_ref(p.str_or(&["ref"], "")).to_string();
            event.files_changed = files_changed(p);
            event.details = push_details(p);
        }
        "pull_request" => {
            let merged = p.flag(&["pull_request", "merged"]);
            if p.str(&["action"]) == Some("closed") && merged {
                event.event_type = EventType::Merge;
            }
            event.branch = p.str_or(&["pull_request", "head", "ref"], "").to_string();
            event.details = pull_request_details(p, merged);
        }
        "create" => {
            event.event_type = EventType::BranchCreate;
            event.branch = p.str_or(&["ref"], "").to_string();
            event.details = ref_details(p);
        }
        "delete" => {
            event.event_type = EventType::BranchDelete;
            event.branch = p.str_or(&["ref"], "").to_string();
            event.details = ref_details(p);
        }
        "issues" => {
            event.details = issues_details(p);
        }
        _ => {}
    }

    event
}

/// Sorted union of added, modified and removed paths across all commits.
fn files_changed(p: Payload<'_>) -> Vec<String> {
    let mut files = BTreeSet::new();
    for commit in p.array(&["commits"]) {
        let commit = Payload::new(commit);
        for key in ["added", "modified", "removed"] {
            files.extend(commit.strings(&[key]).map(str::to_string));
        }
    }
    files.into_iter().collect()
}

fn push_details(p: Payload<'_>) -> Map<String, Value> {
    into_map(json!({
        "commits": p.array(&["commits"]).len(),
        "before": p.str_or(&["before"], ""),
        "after": p.str_or(&["after"], ""),
        "compare_url": p.str_or(&["compare"], ""),
    }))
}

fn pull_request_details(p: Payload<'_>, merged: bool) -> Map<String, Value> {
    into_map(json!({
        "action": p.str_or(&["action"], ""),
        "pr_number": p.number_or_null(&["pull_request", "number"]),
        "pr_title": p.str_or(&["pull_request", "title"], ""),
        "source_branch": p.str_or(&["pull_request", "head", "ref"], ""),
        "target_branch": p.str_or(&["pull_request", "base", "ref"], ""),
        "merged": merged,
        "html_url": p.str_or(&["pull_request", "html_url"], ""),
    }))
}

fn ref_details(p: Payload<'_>) -> Map<String, Value> {
    into_map(json!({
        "ref_type": p.str_or(&["ref_type"], "branch"),
    }))
}

fn issues_details(p: Payload<'_>) -> Map<String, Value> {
    into_map(json!({
        "action": p.str_or(&["action"], ""),
        "issue_number": p.number_or_null(&["issue", "number"]),
        "issue_title": p.str_or(&["issue", "title"], ""),
        "html_url": p.str_or(&["issue", "html_url"], ""),
    }))
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
