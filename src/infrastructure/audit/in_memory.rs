//! In-memory audit log

use parking_lot::Mutex;

use crate::domain::audit::{AuditEvent, AuditSink, AuditSummary};

/// Append-only audit log kept in memory, in emission order
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Per-kind tally of the recorded events
    pub fn summary(&self) -> AuditSummary {
        AuditSummary::from_events(self.events.lock().iter())
    }
}

impl AuditSink for InMemoryAuditLog {
    fn append(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}
