//! Cart (pre-checkout staging) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Cart entry from database; unique per (student, book)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CartEntry {
    pub id: i32,
    pub student_id: Uuid,
    pub book_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Cart entry joined with the book's current display fields
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CartItem {
    pub id: i32,
    pub book_id: i32,
    pub title: String,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Add to cart request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddToCart {
    pub book_id: i32,
}

/// Outcome of a checkout; items are committed one by one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSummary {
    /// Titles turned into loans
    pub borrowed: Vec<String>,
    /// Titles skipped for lack of stock
    pub failed: Vec<String>,
    pub total_borrowed: usize,
}
