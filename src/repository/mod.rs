//! Repository layer for database operations
//!
//! Each store is an async trait so the services can run against PostgreSQL
//! in production and against [`memory::MemoryStore`] in unit tests.

pub mod books;
pub mod carts;
pub mod loans;
pub mod reports;
pub mod users;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, StockMovement, UpdateBook},
        cart::{CartEntry, CartItem},
        loan::{Loan, LoanDetails, LoanQuery, LoanTransition, NewLoan},
        user::{NewUser, Principal, User, UserChanges, UserQuery},
    },
};

/// Identity collaborator: accounts and caller resolution
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a caller to its role and active flag
    async fn resolve(&self, id: Uuid) -> AppResult<Option<Principal>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)>;
    async fn username_exists(&self, username: &str, exclude: Option<Uuid>) -> AppResult<bool>;
    async fn create(&self, user: NewUser) -> AppResult<User>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>>;
    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<User>>;
    /// Fails with Conflict while loans reference the user
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Catalog collaborator: books and their stock ledger
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get(&self, id: i32) -> AppResult<Option<Book>>;
    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;
    async fn create(&self, book: &CreateBook) -> AppResult<Book>;
    /// Applies a copy-count edit to both counters; Validation if stock would go negative
    async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Option<Book>>;
    /// Fails with Conflict while loans reference the book
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn movements(&self, book_id: i32) -> AppResult<Vec<StockMovement>>;
}

/// Per-student staging area
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Fails with DuplicateEntry if the book is already in the cart
    async fn add(&self, student_id: Uuid, book_id: i32, at: DateTime<Utc>) -> AppResult<CartEntry>;
    /// No-op if absent
    async fn remove(&self, student_id: Uuid, book_id: i32) -> AppResult<()>;
    async fn items(&self, student_id: Uuid) -> AppResult<Vec<CartItem>>;
    async fn clear(&self, student_id: Uuid) -> AppResult<u64>;
}

/// Loan records and the stock moves tied to them
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get(&self, id: i32) -> AppResult<Option<Loan>>;
    async fn details(&self, id: i32) -> AppResult<Option<LoanDetails>>;
    /// Takes one copy off the shelf and records the loan atomically.
    /// Fails with OutOfStock when no copy is available.
    async fn open(&self, loan: NewLoan) -> AppResult<Loan>;
    /// Applies a transition if the loan is still in `transition.from`,
    /// else fails with ConcurrentUpdate and changes nothing
    async fn apply(&self, transition: &LoanTransition) -> AppResult<Loan>;
    /// Write-once; fails with AlreadyRated if a rating is present
    async fn rate(&self, id: i32, rating: i16) -> AppResult<Loan>;
    async fn search(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)>;
    /// (BORROWED loans, distinct active students holding one)
    async fn circulation_counts(&self) -> AppResult<(i64, i64)>;
    async fn for_student(&self, student_id: Uuid) -> AppResult<Vec<LoanDetails>>;
    /// BORROWED loans due on `date`
    async fn due_on(&self, date: NaiveDate) -> AppResult<Vec<LoanDetails>>;
    /// BORROWED loans with a due date before `today`
    async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub books: books::BooksRepository,
    pub carts: carts::CartsRepository,
    pub loans: loans::LoansRepository,
    pub reports: reports::ReportsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            carts: carts::CartsRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            reports: reports::ReportsRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Page and page size from optional query values, page numbers start at 1
pub(crate) fn paging(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 200);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

/// True for a PostgreSQL unique constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// True for a PostgreSQL foreign key violation
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}
