//! Caller resolution and role policy checks

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        policy::{self, Operation},
        user::Principal,
    },
    repository::UserDirectory,
};

/// Resolve the caller without checking any operation
pub async fn resolve(users: &dyn UserDirectory, actor: Uuid) -> AppResult<Principal> {
    users
        .resolve(actor)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown user".to_string()))
}

/// Resolve the caller and check it may run `op`
pub async fn authorize(users: &dyn UserDirectory, actor: Uuid, op: Operation) -> AppResult<Principal> {
    let principal = resolve(users, actor).await?;

    if !policy::is_allowed(op, principal.role) {
        tracing::debug!(user_id = %actor, role = %principal.role, ?op, "Operation denied");
        return Err(AppError::Authorization(format!(
            "Role {} may not perform {:?}",
            principal.role, op
        )));
    }

    if op.is_self_service() && !principal.active {
        return Err(AppError::Authorization(
            "Account is inactive, self-service is disabled".to_string(),
        ));
    }

    Ok(principal)
}
