//! Audit sink implementations

mod channel;
mod in_memory;
mod trail;

pub use channel::ChannelAuditSink;
pub use in_memory::InMemoryAuditLog;
pub use trail::AuditTrail;
