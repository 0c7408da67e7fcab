//! Aggregate queries over loan records

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        enums::{FineKind, LoanStatus},
        report::{Interval, LateStudent, PeriodCount, ReportPeriod, SummaryReport, TitleCount, TitleRating},
    },
};

const PERIOD_FILTER: &str =
    "($1::date IS NULL OR l.borrow_date >= $1) AND ($2::date IS NULL OR l.borrow_date <= $2)";

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn summary(&self, today: NaiveDate) -> AppResult<SummaryReport> {
        let summary = sqlx::query_as::<_, SummaryReport>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = $1) AS borrowed,
                COUNT(*) FILTER (WHERE status = $2) AS pending_confirmation,
                COUNT(*) FILTER (WHERE status = $3) AS returned,
                COUNT(*) FILTER (WHERE status = $1 AND due_date < $4) AS overdue,
                COALESCE(SUM(fine_amount) FILTER (WHERE status = $3), 0)::bigint AS total_fines
            FROM loans
            "#,
        )
        .bind(LoanStatus::Borrowed)
        .bind(LoanStatus::PendingConfirmation)
        .bind(LoanStatus::Returned)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    pub async fn most_borrowed(&self, period: &ReportPeriod, limit: i64) -> AppResult<Vec<TitleCount>> {
        let query = format!(
            r#"
            SELECT b.id AS book_id, b.title, COUNT(*) AS loans
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE {}
            GROUP BY b.id, b.title
            ORDER BY loans DESC, b.title
            LIMIT $3
            "#,
            PERIOD_FILTER
        );
        let rows = sqlx::query_as::<_, TitleCount>(&query)
            .bind(period.from)
            .bind(period.to)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn late_students(&self, period: &ReportPeriod, limit: i64) -> AppResult<Vec<LateStudent>> {
        let query = format!(
            r#"
            SELECT u.id AS student_id, u.name, u.student_number, u.class_name,
                   COUNT(*) AS late_returns,
                   COALESCE(SUM(l.fine_amount), 0)::bigint AS late_fines
            FROM loans l
            JOIN users u ON u.id = l.student_id
            WHERE {} AND l.status = $4 AND l.fine_kind = $5
            GROUP BY u.id, u.name, u.student_number, u.class_name
            ORDER BY late_returns DESC, late_fines DESC, u.name
            LIMIT $3
            "#,
            PERIOD_FILTER
        );
        let rows = sqlx::query_as::<_, LateStudent>(&query)
            .bind(period.from)
            .bind(period.to)
            .bind(limit)
            .bind(LoanStatus::Returned)
            .bind(FineKind::Late)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn top_rated(&self, period: &ReportPeriod, limit: i64) -> AppResult<Vec<TitleRating>> {
        let query = format!(
            r#"
            SELECT b.id AS book_id, b.title,
                   AVG(l.rating)::float8 AS average_rating,
                   COUNT(l.rating) AS ratings
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE {} AND l.rating IS NOT NULL
            GROUP BY b.id, b.title
            ORDER BY average_rating DESC, ratings DESC, b.title
            LIMIT $3
            "#,
            PERIOD_FILTER
        );
        let rows = sqlx::query_as::<_, TitleRating>(&query)
            .bind(period.from)
            .bind(period.to)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn loans_per_period(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        interval: Interval,
    ) -> AppResult<Vec<PeriodCount>> {
        let date_trunc = format!("DATE_TRUNC('{}', l.borrow_date)", interval.unit());
        let query = format!(
            r#"
            SELECT TO_CHAR({}, '{}') AS period, COUNT(*) AS loans
            FROM loans l
            WHERE {}
            GROUP BY {}
            ORDER BY {}
            "#,
            date_trunc,
            interval.label_format(),
            PERIOD_FILTER,
            date_trunc,
            date_trunc
        );
        let rows = sqlx::query_as::<_, PeriodCount>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
