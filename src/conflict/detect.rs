//! Time-windowed overlap check between pushes on different branches.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{ConflictAlert, Event, Severity};

/// Trailing window inside which overlapping pushes count as a conflict risk.
pub const WINDOW_MINUTES: i64 = 10;

/// Checks a new push against recent events for overlapping file changes.
///
/// Returns `None` unless `new_event` is a push with at least one changed file
/// and some earlier push on a different, non-empty branch touched one of the
/// same files no more than [`WINDOW_MINUTES`] before it.
///
/// Only candidates at or before the new event are considered. A candidate whose
/// timestamp is later than the new event's, or does not parse, is skipped. If
/// the new event's own timestamp does not parse, the current time is used.
pub fn detect_conflicts(new_event: &Event, recent: &[Event]) -> Option<ConflictAlert> {
    detect_conflicts_at(new_event, recent, Utc::now())
}

/// As [`detect_conflicts`], with `now` as the fallback for a malformed new timestamp.
pub fn detect_conflicts_at(
    new_event: &Event,
    recent: &[Event],
    now: DateTime<Utc>,
) -> Option<ConflictAlert> {
    if !new_event.event_type.is_push() || new_event.files_changed.is_empty() {
        return None;
    }

    let new_files: BTreeSet<&str> = new_event.files_changed.iter().map(String::as_str).collect();
    let new_ts = new_event.timestamp.parse().unwrap_or(now);
    let window = TimeDelta::minutes(WINDOW_MINUTES);

    let mut files: BTreeSet<&str> = BTreeSet::new();
    let mut branches: BTreeSet<&str> = BTreeSet::new();

    for candidate in recent {
        if !candidate.event_type.is_push()
            || candidate.branch.is_empty()
            || candidate.branch == new_event.branch
        {
            continue;
        }

        let Some(candidate_ts) = candidate.timestamp.parse() else {
            continue;
        };
        let age = new_ts - candidate_ts;
        if age < TimeDelta::zero() || age > window {
            continue;
        }

        let mut overlapped = false;
        for file in &candidate.files_changed {
            if new_files.contains(file.as_str()) {
                files.insert(file.as_str());
                overlapped = true;
            }
        }
        if overlapped {
            branches.insert(candidate.branch.as_str());
        }
    }

    let first_branch = *branches.first()?;
    let first_file = *files.first()?;

    let mut message =
        format!("Branch '{}' and '{first_branch}' both modified '{first_file}'", new_event.branch);
    match files.len() - 1 {
        0 => {}
        1 => message.push_str(" and 1 more file"),
        more => message.push_str(&format!(" and {more} more files")),
    }

    Some(ConflictAlert {
        kind: ConflictAlert::KIND.to_string(),
        severity: Severity::for_file_count(files.len()),
        message,
        branches: std::iter::once(new_event.branch.clone())
            .chain(branches.into_iter().map(str::to_string))
            .collect(),
        conflicting_files: files.into_iter().map(str::to_string).collect(),
    })
}
