//! Merge-conflict risk detection.
//!
//! Two pushes to different branches that touch the same file within a short
//! trailing window are likely to conflict when both are merged. The detector
//! compares each new push against the recent window and, on overlap, produces a
//! [`ConflictAlert`](crate::types::ConflictAlert) that is attached to the event
//! before it is stored and broadcast.

mod detect;

pub use detect::{WINDOW_MINUTES, detect_conflicts, detect_conflicts_at};
