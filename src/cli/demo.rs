//! Demo command - end-to-end key lifecycle scenario

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::domain::DomainError;
use crate::domain::api_key::Permission;
use crate::domain::authorization::{DecisionKind, PermissionEventKind};
use crate::domain::cache::{CacheKey, DecisionCacheEntries, PrincipalId, RoleId};
use crate::infrastructure::cache::InMemoryRoleAssignments;
use crate::infrastructure::services::IamService;

use super::{Bootstrap, emit};

const TENANT: &str = "acme_corp";
const OTHER_TENANT: &str = "beta_inc";
const PAY: &str = "payments:create";
const INV: &str = "invoices:read";
const CUST: &str = "customers:write";

/// Run the demo scenario, printing each step as a JSON line
pub async fn run(with_metrics: bool) -> anyhow::Result<()> {
    let bootstrap = Bootstrap::init(with_metrics);

    let (role_assignments, seed) = demo_fixtures()?;
    let service = IamService::from_config(&bootstrap.config, Arc::new(role_assignments), seed)?;

    info!("Running demo scenario");
    let steps = scenario(&service).await?;

    service.shutdown().await;
    for step in &steps {
        emit(step)?;
    }
    emit(&json!({
        "audit_summary": service.audit_summary(),
        "audit_dropped": service.audit_dropped(),
    }))?;

    bootstrap.finish();
    Ok(())
}

/// Roles `a,b -> role_dev`, `c -> role_ops`, and a cache of four ALLOW entries
fn demo_fixtures() -> Result<(InMemoryRoleAssignments, DecisionCacheEntries), DomainError> {
    let role_dev = RoleId::new("role_dev")?;
    let role_ops = RoleId::new("role_ops")?;

    let role_assignments = InMemoryRoleAssignments::new()
        .assign(PrincipalId::new("a")?, role_dev.clone())
        .assign(PrincipalId::new("b")?, role_dev)
        .assign(PrincipalId::new("c")?, role_ops);

    let mut seed = DecisionCacheEntries::new();
    for (principal, permission) in [("a", "pay"), ("a", "inv"), ("b", "pay"), ("c", "pay")] {
        seed.insert(
            CacheKey::new(PrincipalId::new(principal)?, Permission::new(permission)?),
            DecisionKind::Allow,
        );
    }

    Ok((role_assignments, seed))
}

fn step(name: &str, result: impl Serialize) -> Result<Value, serde_json::Error> {
    Ok(json!({ "step": name, "result": serde_json::to_value(result)? }))
}

fn failed_step(name: &str, error: &DomainError) -> Value {
    json!({ "step": name, "error": error.to_string() })
}

async fn scenario(service: &IamService) -> anyhow::Result<Vec<Value>> {
    let mut steps = Vec::new();

    let created = service.create_key(&[PAY, INV], &[PAY, INV, CUST], TENANT).await?;
    let key_id = created.public_id.to_string();
    steps.push(step("create_key", &created)?);

    steps.push(step("authorize_granted", service.authorize(&key_id, PAY, TENANT).await?)?);
    steps.push(step("authorize_not_granted", service.authorize(&key_id, CUST, TENANT).await?)?);
    steps.push(step(
        "authorize_wrong_tenant",
        service.authorize(&key_id, CUST, OTHER_TENANT).await?,
    )?);

    for name in ["revoke_scope", "revoke_scope_again"] {
        let outcome = service
            .apply_permission_event(&key_id, PermissionEventKind::Revoke, INV)
            .await?;
        steps.push(step(name, outcome)?);
    }
    let granted = service
        .apply_permission_event(&key_id, PermissionEventKind::Grant, CUST)
        .await?;
    steps.push(step("grant_scope", granted)?);
    steps.push(step(
        "authorize_after_grant",
        service.authorize(&key_id, CUST, TENANT).await?,
    )?);

    steps.push(step("rotate_key", service.rotate_key(&key_id).await?)?);
    steps.push(step("revoke_key", service.revoke_key(&key_id).await?)?);
    steps.push(step(
        "authorize_after_revoke",
        service.authorize(&key_id, PAY, TENANT).await?,
    )?);
    steps.push(step(
        "grant_after_revoke",
        service
            .apply_permission_event(&key_id, PermissionEventKind::Grant, INV)
            .await?,
    )?);
    steps.push(step("rotate_after_revoke", service.rotate_key(&key_id).await?)?);
    steps.push(step("revoke_again", service.revoke_key(&key_id).await?)?);

    match service.create_key(&[CUST], &[PAY, INV], TENANT).await {
        Ok(created) => steps.push(step("create_key_exceeding_grant", &created)?),
        Err(e) => steps.push(failed_step("create_key_exceeding_grant", &e)),
    }

    steps.push(step(
        "invalidate_cache",
        service.invalidate_cache("role_dev", "pay", None)?,
    )?);

    Ok(steps)
}
