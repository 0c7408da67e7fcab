//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};

use super::{paging, Catalog};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, StockMovement, UpdateBook},
        enums::StockReason,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Append one stock ledger entry on the caller's connection
pub(crate) async fn record_movement(
    conn: &mut PgConnection,
    book_id: i32,
    loan_id: Option<i32>,
    delta: i32,
    reason: StockReason,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO stock_movements (book_id, loan_id, delta, reason) VALUES ($1, $2, $3, $4)",
    )
    .bind(book_id)
    .bind(loan_id)
    .bind(delta)
    .bind(reason)
    .execute(&mut *conn)
    .await?;

    tracing::info!(book_id, ?loan_id, delta, reason = %reason, "Stock adjusted");
    Ok(())
}

#[async_trait]
impl Catalog for BooksRepository {
    async fn get(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (_, per_page, offset) = paging(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref title) = query.title {
            params.push(format!("%{}%", title.to_lowercase()));
            conditions.push(format!("LOWER(title) LIKE ${}", params.len()));
        }

        if let Some(ref category) = query.category {
            params.push(category.clone());
            conditions.push(format!("category = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM books {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT * FROM books {} ORDER BY title, id LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query_as::<_, Book>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let books = select_builder.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, publisher, year, category,
                               total_copies, available_stock, cover_image)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.year)
        .bind(&book.category)
        .bind(book.total_copies)
        .bind(&book.cover_image)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let total_copies = changes.total_copies.unwrap_or(current.total_copies);
        let available_stock = current.restocked_for(total_copies).ok_or_else(|| {
            AppError::Validation(format!(
                "Cannot reduce copies to {}: {} copies are on loan",
                total_copies,
                current.on_loan()
            ))
        })?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                publisher = COALESCE($4, publisher),
                year = COALESCE($5, year),
                category = COALESCE($6, category),
                cover_image = COALESCE($7, cover_image),
                total_copies = $8,
                available_stock = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(&changes.publisher)
        .bind(changes.year)
        .bind(&changes.category)
        .bind(&changes.cover_image)
        .bind(total_copies)
        .bind(available_stock)
        .fetch_one(&mut *tx)
        .await?;

        let delta = total_copies - current.total_copies;
        if delta != 0 {
            record_movement(&mut tx, id, None, delta, StockReason::CopyCountEdit).await?;
        }

        tx.commit().await?;
        Ok(Some(book))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referenced {
            return Err(AppError::Conflict(format!(
                "Book {} has loan records and cannot be deleted",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if super::is_foreign_key_violation(&e) {
                    AppError::Conflict(format!("Book {} is still referenced", id))
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn movements(&self, book_id: i32) -> AppResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}
