//! Replay command - executes a JSON script of operations
//!
//! ```json
//! {
//!   "role_assignments": {"a": ["role_dev"]},
//!   "cache": [{"principal_id": "a", "permission": "pay", "decision": "ALLOW"}],
//!   "operations": [
//!     {"op": "create_key", "alias": "k1", "scopes": ["pay"], "granted_permissions": ["pay"], "tenant_id": "acme"},
//!     {"op": "authorize", "key_id": "k1", "action": "pay", "tenant_id": "acme"},
//!     {"op": "invalidate_cache", "role_id": "role_dev", "permission": "pay"}
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::domain::DomainError;
use crate::domain::api_key::Permission;
use crate::domain::authorization::{DecisionKind, PermissionEventKind};
use crate::domain::cache::{CacheKey, DecisionCacheEntries, PrincipalId};
use crate::infrastructure::cache::InMemoryRoleAssignments;
use crate::infrastructure::services::IamService;

use super::{Bootstrap, emit};

#[derive(Args)]
pub struct ReplayArgs {
    /// Path to the JSON script
    pub file: PathBuf,
}

/// A replay script
#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub role_assignments: InMemoryRoleAssignments,
    /// Decisions present in the cache before the first operation
    #[serde(default)]
    pub cache: Vec<SeedEntry>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Deserialize)]
pub struct SeedEntry {
    pub principal_id: PrincipalId,
    pub permission: Permission,
    pub decision: DecisionKind,
}

/// One scripted call; `key_id` may name an alias given at creation
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateKey {
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        scopes: Vec<String>,
        granted_permissions: Vec<String>,
        tenant_id: String,
    },
    RotateKey {
        key_id: String,
    },
    RevokeKey {
        key_id: String,
    },
    GetKey {
        key_id: String,
    },
    ListKeys {
        #[serde(default)]
        tenant_id: Option<String>,
    },
    Authorize {
        key_id: String,
        action: String,
        tenant_id: String,
    },
    ApplyPermissionEvent {
        key_id: String,
        kind: PermissionEventKind,
        permission: String,
    },
    InvalidateCache {
        role_id: String,
        permission: String,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Self::CreateKey { .. } => "create_key",
            Self::RotateKey { .. } => "rotate_key",
            Self::RevokeKey { .. } => "revoke_key",
            Self::GetKey { .. } => "get_key",
            Self::ListKeys { .. } => "list_keys",
            Self::Authorize { .. } => "authorize",
            Self::ApplyPermissionEvent { .. } => "apply_permission_event",
            Self::InvalidateCache { .. } => "invalidate_cache",
        }
    }
}

impl Script {
    pub fn parse(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    fn seed_entries(&self) -> DecisionCacheEntries {
        self.cache
            .iter()
            .map(|entry| {
                (
                    CacheKey::new(entry.principal_id.clone(), entry.permission.clone()),
                    entry.decision,
                )
            })
            .collect()
    }
}

/// Run a script file, printing one JSON line per operation and the audit summary
pub async fn run(args: ReplayArgs, with_metrics: bool) -> anyhow::Result<()> {
    let bootstrap = Bootstrap::init(with_metrics);

    let input = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read script {}", args.file.display()))?;
    let script = Script::parse(&input)
        .with_context(|| format!("Invalid script {}", args.file.display()))?;

    let service = IamService::from_config(
        &bootstrap.config,
        Arc::new(script.role_assignments.clone()),
        script.seed_entries(),
    )?;

    info!(
        operations = script.operations.len(),
        file = %args.file.display(),
        "Replaying script"
    );
    let results = replay(&service, &script.operations).await?;

    service.shutdown().await;
    for result in &results {
        emit(result)?;
    }
    emit(&json!({
        "audit_summary": service.audit_summary(),
        "audit_dropped": service.audit_dropped(),
    }))?;

    bootstrap.finish();
    Ok(())
}

/// Execute operations in order
///
/// Domain errors are reported per operation and do not stop the replay.
pub async fn replay(service: &IamService, operations: &[Operation]) -> anyhow::Result<Vec<Value>> {
    let mut aliases: HashMap<String, String> = HashMap::new();
    let mut results = Vec::with_capacity(operations.len());

    for (index, operation) in operations.iter().enumerate() {
        let outcome = execute(service, operation, &mut aliases).await;
        let line = match outcome {
            Ok(result) => json!({ "index": index, "op": operation.name(), "result": result }),
            Err(ReplayError::Domain(e)) => {
                json!({ "index": index, "op": operation.name(), "error": e.to_string() })
            }
            Err(ReplayError::Output(e)) => return Err(e.into()),
        };
        results.push(line);
    }

    Ok(results)
}

#[derive(Debug)]
enum ReplayError {
    Domain(DomainError),
    Output(serde_json::Error),
}

impl From<DomainError> for ReplayError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Output(e)
    }
}

fn resolve(aliases: &HashMap<String, String>, key_id: &str) -> String {
    aliases
        .get(key_id)
        .cloned()
        .unwrap_or_else(|| key_id.to_string())
}

fn to_value(value: impl Serialize) -> Result<Value, ReplayError> {
    Ok(serde_json::to_value(value)?)
}

async fn execute(
    service: &IamService,
    operation: &Operation,
    aliases: &mut HashMap<String, String>,
) -> Result<Value, ReplayError> {
    match operation {
        Operation::CreateKey {
            alias,
            scopes,
            granted_permissions,
            tenant_id,
        } => {
            let created = service
                .create_key(scopes.as_slice(), granted_permissions.as_slice(), tenant_id)
                .await?;
            if let Some(alias) = alias {
                aliases.insert(alias.clone(), created.public_id.to_string());
            }
            to_value(&created)
        }
        Operation::RotateKey { key_id } => {
            to_value(service.rotate_key(&resolve(aliases, key_id)).await?)
        }
        Operation::RevokeKey { key_id } => {
            to_value(service.revoke_key(&resolve(aliases, key_id)).await?)
        }
        Operation::GetKey { key_id } => {
            to_value(service.get_key(&resolve(aliases, key_id)).await?)
        }
        Operation::ListKeys { tenant_id } => {
            to_value(service.list_keys(tenant_id.as_deref()).await?)
        }
        Operation::Authorize {
            key_id,
            action,
            tenant_id,
        } => to_value(
            service
                .authorize(&resolve(aliases, key_id), action, tenant_id)
                .await?,
        ),
        Operation::ApplyPermissionEvent {
            key_id,
            kind,
            permission,
        } => to_value(
            service
                .apply_permission_event(&resolve(aliases, key_id), *kind, permission)
                .await?,
        ),
        Operation::InvalidateCache {
            role_id,
            permission,
            timestamp,
        } => to_value(service.invalidate_cache(role_id, permission, *timestamp)?),
    }
}
