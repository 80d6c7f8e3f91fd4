//! One-line human-readable summaries for normalized events.
//!
//! Titles depend only on the source event kind and the raw payload. Missing
//! fields fall back to placeholders (`someone`, `?`) so a title can always be
//! produced.

use super::payload::{Payload, short_ref};

/// Builds the display title for a raw webhook of kind `event_kind`.
pub fn generate_title(event_kind: &str, payload: Payload<'_>) -> String {
    match event_kind {
        "push" => push_title(payload),
        "pull_request" => pull_request_title(payload),
        "create" => ref_title("created", payload),
        "delete" => ref_title("deleted", payload),
        "issues" => issues_title(payload),
        other => {
            let sender = payload.str_or(&["sender", "login"], "someone");
            format!("{sender} triggered {other} event")
        }
    }
}

fn push_title(payload: Payload<'_>) -> String {
    let pusher = payload.str_or(&["pusher", "name"], "someone");
    let count = payload.array(&["commits"]).len();
    let branch = short_ref(payload.str_or(&["ref"], ""));
    let noun = if count == 1 { "commit" } else { "commits" };
    format!("{pusher} pushed {count} {noun} to {branch}")
}

fn pull_request_title(payload: Payload<'_>) -> String {
    let action = payload.str_or(&["action"], "updated");
    let user = payload.str_or(&["pull_request", "user", "login"], "someone");
    let number = payload.number_label(&["pull_request", "number"]);

    if action == "closed" && payload.flag(&["pull_request", "merged"]) {
        let base = payload.str_or(&["pull_request", "base", "ref"], "main");
        return format!("{user} merged pull request #{number} into {base}");
    }

    let title = payload.str_or(&["pull_request", "title"], "");
    format!("{user} {action} PR #{number}: {title}")
}

fn ref_title(verb: &str, payload: Payload<'_>) -> String {
    let sender = payload.str_or(&["sender", "login"], "someone");
    let ref_type = payload.str_or(&["ref_type"], "branch");
    let ref_name = payload.str_or(&["ref"], "unknown");
    format!("{sender} {verb} {ref_type} {ref_name}")
}

fn issues_title(payload: Payload<'_>) -> String {
    let sender = payload.str_or(&["sender", "login"], "someone");
    let action = payload.str_or(&["action"], "updated");
    let number = payload.number_label(&["issue", "number"]);
    let title = payload.str_or(&["issue", "title"], "");
    format!("{sender} {action} issue #{number}: {title}")
}
