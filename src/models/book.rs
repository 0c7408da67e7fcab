//! Book (catalog) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::StockReason;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub category: Option<String>,
    /// Copies owned by the library
    pub total_copies: i32,
    /// Copies on the shelf (not on loan)
    pub available_stock: i32,
    /// Stored cover reference
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently held by borrowers (or lost/damaged pending a copy-count edit)
    pub fn on_loan(&self) -> i32 {
        self.total_copies - self.available_stock
    }

    /// Stock after changing the number of owned copies, or None if it would go negative
    pub fn restocked_for(&self, total_copies: i32) -> Option<i32> {
        let available = self.available_stock + (total_copies - self.total_copies);
        (available >= 0).then_some(available)
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub total_copies: i32,
    pub cover_image: Option<String>,
}

/// Update book request; a changed copy count moves available stock by the same delta
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub total_copies: Option<i32>,
    pub cover_image: Option<String>,
}

/// Book search parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive title fragment
    pub title: Option<String>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One entry of the append-only stock ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockMovement {
    pub id: i64,
    pub book_id: i32,
    pub loan_id: Option<i32>,
    pub delta: i32,
    pub reason: StockReason,
    pub created_at: DateTime<Utc>,
}
