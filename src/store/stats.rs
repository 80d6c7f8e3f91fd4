//! Dashboard statistics derived from the recent window.

use std::collections::HashSet;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Event;

/// Aggregate counts shown on the dashboard.
///
/// Computed over the bounded recent window only, so a busy day that overflows
/// the window undercounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Events timestamped at or after the start of the current UTC day.
    pub total_events_today: usize,
    /// Distinct actors with an event in the trailing hour.
    pub active_contributors: usize,
    /// Distinct non-empty branches among today's events.
    pub branches_modified: usize,
    /// Today's events carrying a conflict alert.
    pub conflict_alerts: usize,
}

/// Computes [`Stats`] for `events` as of `now`.
///
/// Events whose timestamp does not parse are left out of every count.
pub fn compute_stats(events: &[Event], now: DateTime<Utc>) -> Stats {
    let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let hour_ago = now - TimeDelta::hours(1);

    let mut stats = Stats::default();
    let mut contributors = HashSet::new();
    let mut branches = HashSet::new();

    for event in events {
        let Some(ts) = event.timestamp.parse() else {
            continue;
        };

        if ts >= today_start {
            stats.total_events_today += 1;
            if !event.branch.is_empty() {
                branches.insert(event.branch.as_str());
            }
            if event.has_alert() {
                stats.conflict_alerts += 1;
            }
        }

        if ts >= hour_ago {
            contributors.insert(event.actor.as_str());
        }
    }

    stats.active_contributors = contributors.len();
    stats.branches_modified = branches.len();
    stats
}
