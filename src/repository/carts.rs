//! Cart entries repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{is_unique_violation, CartStore};
use crate::{
    error::{AppError, AppResult, CirculationError},
    models::cart::{CartEntry, CartItem},
};

#[derive(Clone)]
pub struct CartsRepository {
    pool: Pool<Postgres>,
}

impl CartsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for CartsRepository {
    async fn add(&self, student_id: Uuid, book_id: i32, at: DateTime<Utc>) -> AppResult<CartEntry> {
        sqlx::query_as::<_, CartEntry>(
            r#"
            INSERT INTO cart_entries (student_id, book_id, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(book_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CirculationError::DuplicateEntry.into()
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn remove(&self, student_id: Uuid, book_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM cart_entries WHERE student_id = $1 AND book_id = $2")
            .bind(student_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn items(&self, student_id: Uuid) -> AppResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT c.id, c.book_id, b.title, b.author, b.cover_image, c.created_at as added_at
            FROM cart_entries c
            JOIN books b ON b.id = c.book_id
            WHERE c.student_id = $1
            ORDER BY c.created_at, c.id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn clear(&self, student_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM cart_entries WHERE student_id = $1")
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
