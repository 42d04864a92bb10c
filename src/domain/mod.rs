//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod audit;
pub mod authorization;
pub mod cache;
pub mod error;
pub mod identifier;

pub use api_key::{ApiKey, ApiKeyId, ApiKeyRepository, KeyHandle, Permission, Secret, TenantId};
pub use audit::{AuditEvent, AuditEventKind, AuditSink, AuditSummary};
pub use authorization::{
    AuthorizationRequest, Decision, DecisionKind, DecisionReason, PermissionEvent,
    PermissionEventKind, ScopeEventOutcome, ScopeEventReason, ScopeEventStatus,
};
pub use cache::{
    CacheKey, DecisionCacheEntries, InvalidationMetrics, PrincipalId, RoleAssignments, RoleId,
    RolePermissionRemoved,
};
pub use error::DomainError;
pub use identifier::IdentifierValidationError;
