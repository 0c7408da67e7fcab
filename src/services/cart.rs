//! Cart and checkout service

use std::sync::Arc;

use uuid::Uuid;

use super::{access::authorize, circulation::CirculationService, clock::Clock};
use crate::{
    error::{AppResult, CirculationError},
    models::{
        cart::{CartEntry, CartItem, CheckoutSummary},
        loan::NewLoan,
        policy::Operation,
    },
    repository::{CartStore, Catalog, UserDirectory},
};

#[derive(Clone)]
pub struct CartService {
    users: Arc<dyn UserDirectory>,
    books: Arc<dyn Catalog>,
    carts: Arc<dyn CartStore>,
    circulation: CirculationService,
    clock: Arc<dyn Clock>,
}

impl CartService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        books: Arc<dyn Catalog>,
        carts: Arc<dyn CartStore>,
        circulation: CirculationService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            books,
            carts,
            circulation,
            clock,
        }
    }

    /// Stage a book; stock is only checked at checkout
    pub async fn add(&self, actor: Uuid, book_id: i32) -> AppResult<CartEntry> {
        authorize(self.users.as_ref(), actor, Operation::UseCart).await?;
        self.books
            .get(book_id)
            .await?
            .ok_or(CirculationError::BookNotFound(book_id))?;

        let entry = self.carts.add(actor, book_id, self.clock.now()).await?;
        tracing::debug!(student_id = %actor, book_id, "Book added to cart");
        Ok(entry)
    }

    pub async fn remove(&self, actor: Uuid, book_id: i32) -> AppResult<()> {
        authorize(self.users.as_ref(), actor, Operation::UseCart).await?;
        self.carts.remove(actor, book_id).await
    }

    pub async fn items(&self, actor: Uuid) -> AppResult<Vec<CartItem>> {
        authorize(self.users.as_ref(), actor, Operation::UseCart).await?;
        self.carts.items(actor).await
    }

    /// Turn every cart entry into a loan where a copy is available.
    ///
    /// Each item commits on its own and leaves the cart as soon as its loan
    /// exists, so an aborted checkout can be retried without borrowing twice.
    /// Items without stock, or whose book is gone, are reported as failed and
    /// dropped with the rest of the cart; if nothing could be borrowed the cart
    /// is kept and the checkout fails with `NoBooksAvailable`.
    pub async fn checkout(&self, actor: Uuid) -> AppResult<CheckoutSummary> {
        authorize(self.users.as_ref(), actor, Operation::UseCart).await?;

        let items = self.carts.items(actor).await?;
        if items.is_empty() {
            return Err(CirculationError::EmptyCart.into());
        }

        let today = self.circulation.today();
        let due_date = self.circulation.due_date(today)?;
        let mut summary = CheckoutSummary::default();

        for item in items {
            let opened = self
                .circulation
                .open_loan(NewLoan {
                    student_id: actor,
                    book_id: item.book_id,
                    borrow_date: today,
                    due_date,
                    note: None,
                })
                .await;

            match opened {
                Ok(_) => {
                    self.carts.remove(actor, item.book_id).await?;
                    summary.borrowed.push(item.title);
                }
                Err(e)
                    if matches!(
                        e.circulation(),
                        Some(CirculationError::OutOfStock(_) | CirculationError::BookNotFound(_))
                    ) =>
                {
                    summary.failed.push(item.title)
                }
                Err(e) => return Err(e),
            }
        }

        if summary.borrowed.is_empty() {
            return Err(CirculationError::NoBooksAvailable {
                failed: summary.failed,
            }
            .into());
        }

        self.carts.clear(actor).await?;
        summary.total_borrowed = summary.borrowed.len();

        tracing::info!(
            student_id = %actor,
            borrowed = summary.total_borrowed,
            failed = summary.failed.len(),
            "Checkout completed"
        );
        Ok(summary)
    }
}
