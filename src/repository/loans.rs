//! Loans repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{books::record_movement, paging, LoanStore};
use crate::{
    error::{AppResult, CirculationError},
    models::{
        enums::{FineKind, LoanStatus, StockReason},
        loan::{Loan, LoanDetails, LoanQuery, LoanTransition, NewLoan},
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.student_id, u.name AS student_name, l.book_id, b.title AS book_title,
           l.borrow_date, l.due_date, l.return_date, l.status, l.return_condition,
           l.fine_amount, l.fine_kind, l.note, l.rating
    FROM loans l
    JOIN users u ON u.id = l.student_id
    JOIN books b ON b.id = l.book_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn get(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let query = format!("{} WHERE l.id = $1", DETAILS_SELECT);
        let loan = sqlx::query_as::<_, LoanDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn open(&self, loan: NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-set: only one caller can take the last copy
        let taken = sqlx::query(
            r#"
            UPDATE books SET available_stock = available_stock - 1, updated_at = NOW()
            WHERE id = $1 AND available_stock > 0
            "#,
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if taken == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(loan.book_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                CirculationError::OutOfStock(loan.book_id).into()
            } else {
                CirculationError::BookNotFound(loan.book_id).into()
            });
        }

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (student_id, book_id, borrow_date, due_date, status,
                               fine_amount, fine_kind, note)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
            RETURNING *
            "#,
        )
        .bind(loan.student_id)
        .bind(loan.book_id)
        .bind(loan.borrow_date)
        .bind(loan.due_date)
        .bind(LoanStatus::Borrowed)
        .bind(FineKind::None)
        .bind(&loan.note)
        .fetch_one(&mut *tx)
        .await?;

        record_movement(&mut tx, created.book_id, Some(created.id), -1, StockReason::Loan).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn apply(&self, transition: &LoanTransition) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                status = $3,
                return_date = $4,
                return_condition = $5,
                fine_amount = $6,
                fine_kind = $7,
                note = $8,
                updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
            WHERE id = $1 AND status = $2 AND updated_at = $9
            RETURNING *
            "#,
        )
        .bind(transition.loan_id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(transition.return_date)
        .bind(transition.return_condition)
        .bind(transition.fine.amount)
        .bind(transition.fine.kind)
        .bind(&transition.note)
        .bind(transition.last_updated)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CirculationError::ConcurrentUpdate(transition.loan_id))?;

        if transition.restock {
            let restocked = sqlx::query(
                r#"
                UPDATE books SET available_stock = available_stock + 1, updated_at = NOW()
                WHERE id = $1 AND available_stock < total_copies
                "#,
            )
            .bind(transition.book_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if restocked > 0 {
                record_movement(&mut tx, transition.book_id, Some(loan.id), 1, StockReason::Return)
                    .await?;
            } else {
                tracing::warn!(
                    loan_id = loan.id,
                    book_id = transition.book_id,
                    "Shelf already full, return not restocked"
                );
            }
        }

        tx.commit().await?;
        Ok(loan)
    }

    async fn rate(&self, id: i32, rating: i16) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET rating = $2, updated_at = NOW()
            WHERE id = $1 AND rating IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rating)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CirculationError::AlreadyRated(id))?;
        Ok(loan)
    }

    async fn search(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let (_, per_page, offset) = paging(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref keyword) = query.keyword {
            params.push(format!("%{}%", keyword.to_lowercase()));
            conditions.push(format!(
                "(LOWER(b.title) LIKE ${} OR LOWER(u.name) LIKE ${})",
                params.len(),
                params.len()
            ));
        }

        if let Some(status) = query.status {
            params.push(status.as_str().to_string());
            conditions.push(format!("l.status = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!(
            r#"
            SELECT COUNT(*)
            FROM loans l
            JOIN users u ON u.id = l.student_id
            JOIN books b ON b.id = l.book_id
            {}
            "#,
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        // Sort column comes from a closed enum, never from raw input
        let sort = query.sort_by.unwrap_or_default();
        let direction = query.direction.unwrap_or_default().as_sql();
        let select_query = format!(
            "{} {} ORDER BY {} {} NULLS LAST, l.id {} LIMIT {} OFFSET {}",
            DETAILS_SELECT,
            where_clause,
            sort.column(),
            direction,
            direction,
            per_page,
            offset
        );
        let mut select_builder = sqlx::query_as::<_, LoanDetails>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let loans = select_builder.fetch_all(&self.pool).await?;

        Ok((loans, total))
    }

    async fn circulation_counts(&self) -> AppResult<(i64, i64)> {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(DISTINCT l.student_id) FILTER (WHERE u.active)
            FROM loans l
            JOIN users u ON u.id = l.student_id
            WHERE l.status = $1
            "#,
        )
        .bind(LoanStatus::Borrowed)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn for_student(&self, student_id: Uuid) -> AppResult<Vec<LoanDetails>> {
        let query = format!(
            "{} WHERE l.student_id = $1 ORDER BY l.borrow_date DESC, l.id DESC",
            DETAILS_SELECT
        );
        let loans = sqlx::query_as::<_, LoanDetails>(&query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    async fn due_on(&self, date: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let query = format!(
            "{} WHERE l.status = $1 AND l.due_date = $2 ORDER BY u.name, l.id",
            DETAILS_SELECT
        );
        let loans = sqlx::query_as::<_, LoanDetails>(&query)
            .bind(LoanStatus::Borrowed)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let query = format!(
            "{} WHERE l.status = $1 AND l.due_date < $2 ORDER BY l.due_date, l.id",
            DETAILS_SELECT
        );
        let loans = sqlx::query_as::<_, LoanDetails>(&query)
            .bind(LoanStatus::Borrowed)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }
}
