//! Read-only circulation reports

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Time interval for grouping loan counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl Interval {
    /// DATE_TRUNC unit
    pub fn unit(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Year => "year",
        }
    }

    /// TO_CHAR pattern for the period label
    pub fn label_format(&self) -> &'static str {
        match self {
            Interval::Day => "YYYY-MM-DD",
            Interval::Week => "IYYY-\"W\"IW",
            Interval::Month => "YYYY-MM",
            Interval::Year => "YYYY",
        }
    }
}

/// Borrow-date window; both ends inclusive and optional
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams, ToSchema)]
pub struct ReportPeriod {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Maximum rows for ranked reports (default 10)
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams, ToSchema)]
pub struct LoanTrendQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub interval: Option<Interval>,
}

/// Circulation summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct SummaryReport {
    pub borrowed: i64,
    pub pending_confirmation: i64,
    pub returned: i64,
    /// Borrowed loans past their due date
    pub overdue: i64,
    /// Sum of recorded fines, currency minor units
    pub total_fines: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TitleCount {
    pub book_id: i32,
    pub title: String,
    pub loans: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LateStudent {
    pub student_id: Uuid,
    pub name: String,
    pub student_number: Option<String>,
    pub class_name: Option<String>,
    /// Returns that carried a late fine
    pub late_returns: i64,
    pub late_fines: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TitleRating {
    pub book_id: i32,
    pub title: String,
    pub average_rating: f64,
    pub ratings: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PeriodCount {
    pub period: String,
    pub loans: i64,
}
