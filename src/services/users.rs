//! Student and staff account management

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use uuid::Uuid;
use validator::Validate;

use super::access::{authorize, resolve};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::Role,
        policy::{self, manage_account, Operation},
        user::{CreateUser, NewUser, UpdateUser, User, UserChanges, UserQuery},
    },
    repository::UserDirectory,
};

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserDirectory>,
}

/// Hash a password with argon2 and a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

impl UsersService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    async fn target(&self, id: Uuid) -> AppResult<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Caller's own profile
    pub async fn me(&self, actor: Uuid) -> AppResult<User> {
        resolve(self.users.as_ref(), actor).await?;
        self.target(actor).await
    }

    /// Search accounts; librarians only see students
    pub async fn search_users(&self, actor: Uuid, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let principal = authorize(self.users.as_ref(), actor, Operation::ManageStudents).await?;
        let sees_staff = policy::is_allowed(Operation::ManageStaff, principal.role);

        let mut query = query.clone();
        match query.role {
            Some(role) if role.is_staff() && !sees_staff => {
                return Err(AppError::Authorization(
                    "Only the head librarian manages staff accounts".to_string(),
                ));
            }
            None if !sees_staff => query.role = Some(Role::Student),
            _ => {}
        }

        self.users.search(&query).await
    }

    pub async fn get_user(&self, actor: Uuid, id: Uuid) -> AppResult<User> {
        let user = self.target(id).await?;
        authorize(self.users.as_ref(), actor, manage_account(user.role)).await?;
        Ok(user)
    }

    pub async fn create_user(&self, actor: Uuid, user: CreateUser) -> AppResult<User> {
        authorize(self.users.as_ref(), actor, manage_account(user.role)).await?;
        user.validate()?;

        if self.users.username_exists(&user.username, None).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let created = self
            .users
            .create(NewUser {
                password_hash: hash_password(&user.password)?,
                name: user.name,
                username: user.username,
                email: user.email,
                role: user.role,
                staff_number: user.staff_number,
                student_number: user.student_number,
                class_name: user.class_name,
            })
            .await?;

        tracing::info!(user_id = %created.id, role = %created.role, "User created");
        Ok(created)
    }

    pub async fn update_user(&self, actor: Uuid, id: Uuid, changes: UpdateUser) -> AppResult<User> {
        let user = self.target(id).await?;
        authorize(self.users.as_ref(), actor, manage_account(user.role)).await?;
        changes.validate()?;

        if let Some(ref username) = changes.username {
            if self.users.username_exists(username, Some(id)).await? {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }

        let password_hash = changes.password.as_deref().map(hash_password).transpose()?;
        let updated = self
            .users
            .update(
                id,
                UserChanges {
                    name: changes.name,
                    username: changes.username,
                    password_hash,
                    email: changes.email,
                    staff_number: changes.staff_number,
                    student_number: changes.student_number,
                    class_name: changes.class_name,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        tracing::info!(user_id = %id, "User updated");
        Ok(updated)
    }

    /// Toggle the flag gating student self-service
    pub async fn set_active(&self, actor: Uuid, id: Uuid, active: bool) -> AppResult<User> {
        let user = self.target(id).await?;
        authorize(self.users.as_ref(), actor, manage_account(user.role)).await?;

        let updated = self
            .users
            .set_active(id, active)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        tracing::info!(user_id = %id, active, "User active flag changed");
        Ok(updated)
    }

    pub async fn delete_user(&self, actor: Uuid, id: Uuid) -> AppResult<()> {
        let user = self.target(id).await?;
        authorize(self.users.as_ref(), actor, manage_account(user.role)).await?;

        if actor == id {
            return Err(AppError::Conflict("Cannot delete your own account".to_string()));
        }

        self.users.delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
