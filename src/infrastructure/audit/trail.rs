//! Audit trail wiring: the sink emitters write to and the log it lands in

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::domain::audit::{AuditEvent, AuditSink, AuditSummary};

use super::channel::ChannelAuditSink;
use super::in_memory::InMemoryAuditLog;

/// Audit trail backed by an in-memory log
///
/// Either direct (events land in the log synchronously) or queued through a
/// bounded channel drained by a background writer.
#[derive(Debug)]
pub struct AuditTrail {
    log: Arc<InMemoryAuditLog>,
    channel: Option<Arc<ChannelAuditSink>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl AuditTrail {
    /// Events are appended to the log on the emitting task
    pub fn direct() -> Self {
        Self {
            log: Arc::new(InMemoryAuditLog::new()),
            channel: None,
            writer: Mutex::new(None),
        }
    }

    /// Events are queued and written by a spawned task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn queued(capacity: usize) -> Self {
        let log = Arc::new(InMemoryAuditLog::new());
        let (channel, writer) = ChannelAuditSink::spawn(capacity, log.clone());

        Self {
            log,
            channel: Some(Arc::new(channel)),
            writer: Mutex::new(Some(writer)),
        }
    }

    /// The sink emitters append to
    pub fn sink(&self) -> Arc<dyn AuditSink> {
        match &self.channel {
            Some(channel) => Arc::clone(channel) as Arc<dyn AuditSink>,
            None => Arc::clone(&self.log) as Arc<dyn AuditSink>,
        }
    }

    /// Events written so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.log.events()
    }

    pub fn summary(&self) -> AuditSummary {
        self.log.summary()
    }

    /// Events lost to a full or closed queue
    pub fn dropped(&self) -> u64 {
        self.channel.as_ref().map_or(0, |channel| channel.dropped())
    }

    /// Stop accepting events and wait until every queued event is written
    pub async fn shutdown(&self) {
        let Some(channel) = &self.channel else {
            return;
        };
        channel.close();

        let writer = self.writer.lock().take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!("Audit writer terminated abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::ApiKeyId;
    use crate::domain::audit::AuditEventKind;

    fn event(kind: AuditEventKind) -> AuditEvent {
        AuditEvent::now(kind, ApiKeyId::new("sk_test_1").unwrap())
    }

    #[test]
    fn test_direct_trail_is_synchronous() {
        let trail = AuditTrail::direct();

        trail.sink().append(event(AuditEventKind::Created));

        assert_eq!(trail.events().len(), 1);
        assert_eq!(trail.dropped(), 0);
    }

    #[tokio::test]
    async fn test_queued_trail_flushes_on_shutdown() {
        let trail = AuditTrail::queued(8);
        let sink = trail.sink();

        sink.append(event(AuditEventKind::Created));
        sink.append(event(AuditEventKind::Rotated));
        trail.shutdown().await;

        assert_eq!(trail.summary().total(), 2);

        sink.append(event(AuditEventKind::Revoked));
        assert_eq!(trail.dropped(), 1);
        assert_eq!(trail.summary().count(AuditEventKind::Revoked), 0);
    }
}
