//! Shared test fixtures, fake backends and connections, and proptest generators.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use crate::hub::{Connection, ConnectionError};
use crate::store::{Backend, BackendError, MemoryBackend, MemorySubscription};
use crate::types::{ConflictAlert, Event, EventId, EventType, Severity, Timestamp};

/// Parses an RFC 3339 literal.
pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("bad test timestamp {s:?}: {e}"))
        .with_timezone(&Utc)
}

fn base_event(event_type: EventType, actor: &str, branch: &str, timestamp: &str) -> Event {
    Event {
        id: EventId::generate(),
        timestamp: Timestamp::new(timestamp),
        event_type,
        actor: actor.to_string(),
        actor_avatar: String::new(),
        repository: "acme/widgets".to_string(),
        branch: branch.to_string(),
        title: format!("{actor} did something on {branch}"),
        details: serde_json::Map::new(),
        files_changed: Vec::new(),
        alert: None,
    }
}

/// A push to `branch` touching `files` at `timestamp`.
pub fn push_event(branch: &str, files: &[&str], timestamp: &str) -> Event {
    let mut files: Vec<String> = files.iter().map(|f| f.to_string()).collect();
    files.sort();
    files.dedup();

    let mut event = base_event(EventType::Push, "alice", branch, timestamp);
    event.files_changed = files;
    event
}

pub fn with_type(mut event: Event, event_type: EventType) -> Event {
    event.event_type = event_type;
    event
}

/// A push by `actor` on `branch` with no files.
pub fn event_by(actor: &str, branch: &str, timestamp: &str) -> Event {
    base_event(EventType::Push, actor, branch, timestamp)
}

/// An event with the stable id `event-{i}`.
pub fn numbered_event(i: usize) -> Event {
    let mut event = base_event(EventType::Push, "alice", "main", "2024-03-01T12:00:00+00:00");
    event.id = EventId::new(format!("event-{i}"));
    event
}

pub fn alert_for(branch: &str, other: &str, file: &str) -> ConflictAlert {
    ConflictAlert {
        kind: ConflictAlert::KIND.to_string(),
        severity: Severity::Medium,
        message: format!("Branch '{branch}' and '{other}' both modified '{file}'"),
        branches: vec![branch.to_string(), other.to_string()],
        conflicting_files: vec![file.to_string()],
    }
}

pub fn arb_branch_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9/-]{0,30}".prop_map(String::from)
}

pub fn arb_path() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.(rs|py|md)".prop_map(String::from)
}

/// Decrements `counter` if it is non-zero, returning whether it was.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// [`MemoryBackend`] that fails a configurable number of upcoming calls.
#[derive(Debug, Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    write_failures: AtomicU32,
    read_failures: AtomicU32,
    publish_failures: AtomicU32,
    write_attempts: AtomicU32,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` pushes fail.
    pub fn fail_writes(&self, n: u32) {
        self.write_failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` range reads fail.
    pub fn fail_reads(&self, n: u32) {
        self.read_failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` publishes fail.
    pub fn fail_publishes(&self, n: u32) {
        self.publish_failures.store(n, Ordering::SeqCst);
    }

    /// Number of pushes attempted so far, failed or not.
    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn unavailable() -> BackendError {
        BackendError::Unavailable("injected failure".into())
    }
}

impl Backend for FlakyBackend {
    type Subscription = MemorySubscription;

    async fn push_front(&self, key: &str, value: String) -> Result<(), BackendError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.write_failures) {
            return Err(Self::unavailable());
        }
        self.inner.push_front(key, value).await
    }

    async fn trim(&self, key: &str, start: usize, stop: usize) -> Result<(), BackendError> {
        self.inner.trim(key, start, stop).await
    }

    async fn range(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>, BackendError> {
        if take_failure(&self.read_failures) {
            return Err(Self::unavailable());
        }
        self.inner.range(key, start, stop).await
    }

    async fn publish(&self, channel: &str, message: String) -> Result<usize, BackendError> {
        if take_failure(&self.publish_failures) {
            return Err(Self::unavailable());
        }
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MemorySubscription, BackendError> {
        self.inner.subscribe(channel).await
    }
}

/// Connection that records what it was sent.
///
/// Clones share the same log, so a test can keep one clone while the hub owns
/// another. Once `fail_after` sends have succeeded, every further send fails.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnection {
    sent: Arc<Mutex<Vec<String>>>,
    fail_after: Option<usize>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection whose every send fails.
    pub fn broken() -> Self {
        Self::failing_after(0)
    }

    pub fn failing_after(successes: usize) -> Self {
        RecordingConnection {
            sent: Arc::default(),
            fail_after: Some(successes),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Decodes everything sent so far as events.
    pub fn sent_events(&self) -> Vec<Event> {
        self.sent()
            .iter()
            .map(|s| Event::from_json(s).unwrap())
            .collect()
    }
}

impl Connection for RecordingConnection {
    async fn send_text(&self, text: &str) -> Result<(), ConnectionError> {
        let mut sent = self.sent.lock().unwrap();
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(ConnectionError::Closed);
        }
        sent.push(text.to_string());
        Ok(())
    }
}
