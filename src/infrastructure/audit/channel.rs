//! Bounded channel hand-off between audit emitters and a background writer

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::audit::{AuditEvent, AuditSink};

/// Audit sink that never blocks the emitter
///
/// Events go into a bounded queue with `try_send`. When the queue is full or
/// the writer is gone the event is dropped, logged and counted.
#[derive(Debug)]
pub struct ChannelAuditSink {
    sender: RwLock<Option<mpsc::Sender<AuditEvent>>>,
    dropped: AtomicU64,
}

impl ChannelAuditSink {
    /// Create a sink and the receiving end of its queue
    pub fn with_receiver(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let sink = Self {
            sender: RwLock::new(Some(sender)),
            dropped: AtomicU64::new(0),
        };
        (sink, receiver)
    }

    /// Create a sink whose queue is drained into `downstream` by a spawned task
    ///
    /// Must be called from within a Tokio runtime. The task finishes once
    /// the sink is closed and the queue is empty.
    pub fn spawn(capacity: usize, downstream: Arc<dyn AuditSink>) -> (Self, JoinHandle<()>) {
        let (sink, mut receiver) = Self::with_receiver(capacity);

        let writer = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                debug!(event = %event.event, key_id = %event.key_id, "Writing audit event");
                downstream.append(event);
            }
            debug!("Audit writer stopped");
        });

        (sink, writer)
    }

    /// Stop accepting events; queued events are still delivered
    pub fn close(&self) {
        self.sender.write().take();
    }

    /// Number of events lost to a full or closed queue
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, event: &AuditEvent, cause: &'static str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        counter!("iam_audit_events_dropped_total", "cause" => cause).increment(1);
        warn!(
            event = %event.event,
            key_id = %event.key_id,
            cause,
            "Dropped audit event"
        );
    }
}

impl AuditSink for ChannelAuditSink {
    fn append(&self, event: AuditEvent) {
        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            self.record_drop(&event, "closed");
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => self.record_drop(&event, "full"),
            Err(TrySendError::Closed(event)) => self.record_drop(&event, "closed"),
        }
    }
}
