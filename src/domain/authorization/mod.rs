//! Authorization domain - decision rules and the per-key scope state machine

mod decision;
mod scope_event;

pub use decision::{AuthorizationRequest, Decision, DecisionKind, DecisionReason, evaluate};
pub use scope_event::{
    PermissionEvent, PermissionEventKind, ScopeEventOutcome, ScopeEventReason, ScopeEventStatus,
    apply_scope_event,
};
