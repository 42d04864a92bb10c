//! Audit event types

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::api_key::ApiKeyId;

/// Kind of audited key lifecycle or scope change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventKind {
    Created,
    Revoked,
    Rotated,
    ScopeGranted,
    ScopeRevoked,
}

impl AuditEventKind {
    /// Every known kind, in declaration order
    pub const ALL: [AuditEventKind; 5] = [
        Self::Created,
        Self::Revoked,
        Self::Rotated,
        Self::ScopeGranted,
        Self::ScopeRevoked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Revoked => "REVOKED",
            Self::Rotated => "ROTATED",
            Self::ScopeGranted => "SCOPE_GRANTED",
            Self::ScopeRevoked => "SCOPE_REVOKED",
        }
    }
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event: AuditEventKind,
    pub key_id: ApiKeyId,
    /// UTC, truncated to whole seconds
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event stamped with the current time
    pub fn now(event: AuditEventKind, key_id: ApiKeyId) -> Self {
        Self::at(event, key_id, Utc::now())
    }

    /// Create an event at a given time (sub-second precision is dropped)
    pub fn at(event: AuditEventKind, key_id: ApiKeyId, timestamp: DateTime<Utc>) -> Self {
        Self {
            event,
            key_id,
            timestamp: timestamp.trunc_subsecs(0),
        }
    }
}

/// Per-kind tally of audit events
///
/// Every known kind is present, zero when unseen, so summaries stay comparable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    counts: BTreeMap<AuditEventKind, u64>,
}

impl AuditSummary {
    pub fn new() -> Self {
        Self {
            counts: AuditEventKind::ALL.iter().map(|kind| (*kind, 0)).collect(),
        }
    }

    /// Build a summary from a sequence of events
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a AuditEvent>) -> Self {
        let mut summary = Self::new();
        for event in events {
            summary.record(event.event);
        }
        summary
    }

    pub fn record(&mut self, kind: AuditEventKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, kind: AuditEventKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Scope grants plus scope revocations
    pub fn scope_changes(&self) -> u64 {
        self.count(AuditEventKind::ScopeGranted) + self.count(AuditEventKind::ScopeRevoked)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl Default for AuditSummary {
    fn default() -> Self {
        Self::new()
    }
}
