//! IAM Key Core
//!
//! API key lifecycle and request-time authorization for a multi-tenant IAM service:
//! - Key Store: create, rotate and revoke keys; only secret hashes are stored
//! - Decision Engine: tenant-bound ALLOW/DENY decisions and real-time scope events
//! - Cache Invalidation Engine: exact purge of cached decisions when a role loses a permission
//! - Audit trail: fire-and-forget lifecycle events

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use infrastructure::services::IamService;
