//! Audit sink implementations.
//!
//! Cancelled and terminated-group messages are dropped silently by design;
//! the audit trail is how those drops stay observable for diagnosis.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::clock::now_ms;
use crate::util::ids::{GroupId, MessageId, ResourceId};

/// A single scheduler transition worth recording.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    /// Message involved, if the action concerns one.
    pub message: Option<MessageId>,
    /// Group involved.
    pub group: GroupId,
    /// Resource involved, if the action concerns one.
    pub resource: Option<ResourceId>,
    /// Action taken (receive, dispatch, drop_cancelled, drop_terminated,
    /// cancel, complete).
    pub action: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: DispatchEvent);
}

/// In-memory audit sink for testing and dev.
///
/// Clones share the same bounded buffer, so callers can hand one clone to the
/// scheduler and read events back through another.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<DispatchEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Snapshot of recorded actions for a given group, oldest first.
    pub fn actions_for_group(&self, group: &GroupId) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| &e.group == group)
            .map(|e| e.action.clone())
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: DispatchEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_event(
    message: Option<MessageId>,
    group: GroupId,
    resource: Option<ResourceId>,
    action: impl Into<String>,
) -> DispatchEvent {
    DispatchEvent {
        message,
        group,
        resource,
        action: action.into(),
        created_at_ms: now_ms(),
    }
}
