//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, paging, UserDirectory};
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, Principal, User, UserChanges, UserQuery},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn username_taken(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("Username already exists".to_string())
    } else {
        AppError::Database(e)
    }
}

#[async_trait]
impl UserDirectory for UsersRepository {
    async fn resolve(&self, id: Uuid) -> AppResult<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, name, role, active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(principal)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let (_, per_page, offset) = paging(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(role) = query.role {
            params.push(role.as_str().to_string());
            conditions.push(format!("role = ${}", params.len()));
        }

        if let Some(ref name) = query.name {
            params.push(format!("%{}%", name.to_lowercase()));
            conditions.push(format!("LOWER(name) LIKE ${}", params.len()));
        }

        if let Some(ref number) = query.student_number {
            params.push(format!("%{}%", number));
            conditions.push(format!("student_number LIKE ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT * FROM users {} ORDER BY name, username LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query_as::<_, User>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let users = select_builder.fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    async fn username_exists(&self, username: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(username) = LOWER($1) AND ($2::uuid IS NULL OR id != $2)
            )
            "#,
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, username, password_hash, email, role,
                               staff_number, student_number, class_name, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.staff_number)
        .bind(&user.student_number)
        .bind(&user.class_name)
        .fetch_one(&self.pool)
        .await
        .map_err(username_taken)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                password_hash = COALESCE($4, password_hash),
                email = COALESCE($5, email),
                staff_number = COALESCE($6, staff_number),
                student_number = COALESCE($7, student_number),
                class_name = COALESCE($8, class_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.username)
        .bind(&changes.password_hash)
        .bind(&changes.email)
        .bind(&changes.staff_number)
        .bind(&changes.student_number)
        .bind(&changes.class_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(username_taken)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE student_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referenced {
            return Err(AppError::Conflict(
                "User has loan records and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
