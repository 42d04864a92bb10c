use thiserror::Error;

/// Core domain errors
///
/// Only genuine failures live here. Expected business outcomes (DENY decisions,
/// ignored scope events, already-revoked keys) are returned as structured results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Requested scopes exceed granted permissions: {}", scopes.join(", "))]
    ScopeExceedsGrant { scopes: Vec<String> },

    #[error("API key '{key_id}' not found")]
    KeyNotFound { key_id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },
}

impl DomainError {
    pub fn scope_exceeds_grant(scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::ScopeExceedsGrant {
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn key_not_found(key_id: impl Into<String>) -> Self {
        Self::KeyNotFound {
            key_id: key_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}
