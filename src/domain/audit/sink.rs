//! Audit sink collaborator trait

#[cfg(test)]
use mockall::automock;

use super::entity::AuditEvent;

/// Append-only receiver of audit events
///
/// `append` is fire-and-forget: it must not block on I/O and cannot fail the
/// caller. Implementations that can lose events log and count the loss.
#[cfg_attr(test, automock)]
pub trait AuditSink: Send + Sync {
    fn append(&self, event: AuditEvent);
}
