//! Audit domain - append-only key lifecycle events

mod entity;
mod sink;

pub use entity::{AuditEvent, AuditEventKind, AuditSummary};
pub use sink::AuditSink;

#[cfg(test)]
pub use sink::MockAuditSink;
