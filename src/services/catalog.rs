//! Catalog management service

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::access::authorize;
use crate::{
    error::{AppError, AppResult, CirculationError},
    models::{
        book::{Book, BookQuery, CreateBook, StockMovement, UpdateBook},
        policy::Operation,
    },
    repository::{Catalog, UserDirectory},
};

#[derive(Clone)]
pub struct CatalogService {
    users: Arc<dyn UserDirectory>,
    books: Arc<dyn Catalog>,
}

impl CatalogService {
    pub fn new(users: Arc<dyn UserDirectory>, books: Arc<dyn Catalog>) -> Self {
        Self { users, books }
    }

    /// Search books by title and category
    pub async fn search_books(&self, actor: Uuid, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        authorize(self.users.as_ref(), actor, Operation::ViewCatalog).await?;
        self.books.search(query).await
    }

    pub async fn get_book(&self, actor: Uuid, id: i32) -> AppResult<Book> {
        authorize(self.users.as_ref(), actor, Operation::ViewCatalog).await?;
        self.books
            .get(id)
            .await?
            .ok_or_else(|| CirculationError::BookNotFound(id).into())
    }

    /// Add a title; every copy starts on the shelf
    pub async fn create_book(&self, actor: Uuid, book: CreateBook) -> AppResult<Book> {
        authorize(self.users.as_ref(), actor, Operation::ManageCatalog).await?;
        book.validate()?;

        let created = self.books.create(&book).await?;
        tracing::info!(book_id = created.id, copies = created.total_copies, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, actor: Uuid, id: i32, changes: UpdateBook) -> AppResult<Book> {
        authorize(self.users.as_ref(), actor, Operation::ManageCatalog).await?;
        changes.validate()?;

        let updated = self
            .books
            .update(id, &changes)
            .await?
            .ok_or(CirculationError::BookNotFound(id))?;
        tracing::info!(book_id = id, "Book updated");
        Ok(updated)
    }

    pub async fn delete_book(&self, actor: Uuid, id: i32) -> AppResult<()> {
        authorize(self.users.as_ref(), actor, Operation::ManageCatalog).await?;

        if !self.books.delete(id).await? {
            return Err(CirculationError::BookNotFound(id).into());
        }
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// Stock ledger for one title, oldest first
    pub async fn stock_movements(&self, actor: Uuid, id: i32) -> AppResult<Vec<StockMovement>> {
        authorize(self.users.as_ref(), actor, Operation::ManageCatalog).await?;
        if self.books.get(id).await?.is_none() {
            return Err(AppError::from(CirculationError::BookNotFound(id)));
        }
        self.books.movements(id).await
    }
}
