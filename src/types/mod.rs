//! Core domain types for the collaboration monitor.
//!
//! The canonical event schema and the identifiers it is built from.

pub mod event;
pub mod ids;

// Re-export commonly used types at the module level
pub use event::{ConflictAlert, Event, EventType, Severity};
pub use ids::{ConnectionId, EventId, Timestamp};
