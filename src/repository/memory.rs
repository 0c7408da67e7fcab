//! In-memory stores backing the service unit tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{paging, CartStore, Catalog, LoanStore, UserDirectory};
use crate::{
    error::{AppError, AppResult, CirculationError},
    models::{
        book::{Book, BookQuery, CreateBook, StockMovement, UpdateBook},
        cart::{CartEntry, CartItem},
        enums::{FineKind, LoanStatus, Role, StockReason},
        loan::{Loan, LoanDetails, LoanQuery, LoanSortField, LoanTransition, NewLoan, SortDirection},
        user::{NewUser, Principal, User, UserChanges, UserQuery},
    },
};

#[derive(Default)]
struct State {
    users: BTreeMap<Uuid, User>,
    books: BTreeMap<i32, Book>,
    cart: Vec<CartEntry>,
    loans: BTreeMap<i32, Loan>,
    movements: Vec<StockMovement>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn move_stock(&mut self, book_id: i32, loan_id: Option<i32>, delta: i32, reason: StockReason) {
        let id = self.movements.len() as i64 + 1;
        self.movements.push(StockMovement {
            id,
            book_id,
            loan_id,
            delta,
            reason,
            created_at: Utc::now(),
        });
    }

    fn details(&self, loan: &Loan) -> LoanDetails {
        LoanDetails {
            id: loan.id,
            student_id: loan.student_id,
            student_name: self
                .users
                .get(&loan.student_id)
                .map(|u| u.name.clone())
                .unwrap_or_default(),
            book_id: loan.book_id,
            book_title: self
                .books
                .get(&loan.book_id)
                .map(|b| b.title.clone())
                .unwrap_or_default(),
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            status: loan.status,
            return_condition: loan.return_condition,
            fine_amount: loan.fine_amount,
            fine_kind: loan.fine_kind,
            note: loan.note.clone(),
            rating: loan.rating,
            is_overdue: false,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, name: &str, role: Role, active: bool) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            username: name.to_lowercase().replace(' ', "."),
            password_hash: None,
            email: None,
            role,
            staff_number: None,
            student_number: (role == Role::Student).then(|| format!("S-{}", name.len())),
            class_name: None,
            active,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn add_book(&self, title: &str, copies: i32) -> Book {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let book = Book {
            id: state.next_id(),
            title: title.to_string(),
            author: None,
            publisher: None,
            year: None,
            category: None,
            total_copies: copies,
            available_stock: copies,
            cover_image: None,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(book.id, book.clone());
        book
    }

    pub async fn stock(&self, book_id: i32) -> i32 {
        self.state
            .lock()
            .await
            .books
            .get(&book_id)
            .map(|b| b.available_stock)
            .unwrap_or(-1)
    }

    pub async fn loans(&self) -> Vec<Loan> {
        self.state.lock().await.loans.values().cloned().collect()
    }

    pub async fn movements(&self) -> Vec<StockMovement> {
        self.state.lock().await.movements.clone()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn resolve(&self, id: Uuid) -> AppResult<Option<Principal>> {
        Ok(self.state.lock().await.users.get(&id).map(User::principal))
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let (_, per_page, offset) = paging(query.page, query.per_page);
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| query.role.map_or(true, |r| u.role == r))
            .filter(|u| {
                query
                    .name
                    .as_ref()
                    .map_or(true, |n| u.name.to_lowercase().contains(&n.to_lowercase()))
            })
            .filter(|u| {
                query.student_number.as_ref().map_or(true, |n| {
                    u.student_number.as_deref().is_some_and(|s| s.contains(n.as_str()))
                })
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        let total = users.len() as i64;
        let page = users
            .into_iter()
            .skip(offset as usize)
            .take(per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn username_exists(&self, username: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.users.values().any(|u| {
            u.username.eq_ignore_ascii_case(username) && Some(u.id) != exclude
        }))
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            username: user.username,
            password_hash: Some(user.password_hash),
            email: user.email,
            role: user.role,
            staff_number: user.staff_number,
            student_number: user.student_number,
            class_name: user.class_name,
            active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = Some(hash);
        }
        user.email = changes.email.or(user.email.take());
        user.staff_number = changes.staff_number.or(user.staff_number.take());
        user.student_number = changes.student_number.or(user.student_number.take());
        user.class_name = changes.class_name.or(user.class_name.take());
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<User>> {
        let mut state = self.state.lock().await;
        Ok(state.users.get_mut(&id).map(|u| {
            u.active = active;
            u.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.loans.values().any(|l| l.student_id == id) {
            return Err(AppError::Conflict(
                "User has loan records and cannot be deleted".to_string(),
            ));
        }
        state.cart.retain(|c| c.student_id != id);
        Ok(state.users.remove(&id).is_some())
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn get(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (_, per_page, offset) = paging(query.page, query.per_page);
        let state = self.state.lock().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| {
                query
                    .title
                    .as_ref()
                    .map_or(true, |t| b.title.to_lowercase().contains(&t.to_lowercase()))
            })
            .filter(|b| query.category.is_none() || b.category == query.category)
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        let total = books.len() as i64;
        let page = books
            .into_iter()
            .skip(offset as usize)
            .take(per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let created = Book {
            id: state.next_id(),
            title: book.title.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            year: book.year,
            category: book.category.clone(),
            total_copies: book.total_copies,
            available_stock: book.total_copies,
            cover_image: book.cover_image.clone(),
            created_at: now,
            updated_at: now,
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Option<Book>> {
        let mut state = self.state.lock().await;
        let Some(current) = state.books.get(&id).cloned() else {
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

        let mut book = current.clone();
        if let Some(ref title) = changes.title {
            book.title = title.clone();
        }
        book.author = changes.author.clone().or(book.author);
        book.publisher = changes.publisher.clone().or(book.publisher);
        book.year = changes.year.or(book.year);
        book.category = changes.category.clone().or(book.category);
        book.cover_image = changes.cover_image.clone().or(book.cover_image);
        book.total_copies = total_copies;
        book.available_stock = available_stock;
        book.updated_at = Utc::now();
        state.books.insert(id, book.clone());

        let delta = total_copies - current.total_copies;
        if delta != 0 {
            state.move_stock(id, None, delta, StockReason::CopyCountEdit);
        }
        Ok(Some(book))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.loans.values().any(|l| l.book_id == id) {
            return Err(AppError::Conflict(format!(
                "Book {} has loan records and cannot be deleted",
                id
            )));
        }
        state.cart.retain(|c| c.book_id != id);
        Ok(state.books.remove(&id).is_some())
    }

    async fn movements(&self, book_id: i32) -> AppResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .filter(|m| m.book_id == book_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn add(&self, student_id: Uuid, book_id: i32, at: DateTime<Utc>) -> AppResult<CartEntry> {
        let mut state = self.state.lock().await;
        if state
            .cart
            .iter()
            .any(|c| c.student_id == student_id && c.book_id == book_id)
        {
            return Err(CirculationError::DuplicateEntry.into());
        }
        let entry = CartEntry {
            id: state.next_id(),
            student_id,
            book_id,
            created_at: at,
        };
        state.cart.push(entry.clone());
        Ok(entry)
    }

    async fn remove(&self, student_id: Uuid, book_id: i32) -> AppResult<()> {
        self.state
            .lock()
            .await
            .cart
            .retain(|c| !(c.student_id == student_id && c.book_id == book_id));
        Ok(())
    }

    async fn items(&self, student_id: Uuid) -> AppResult<Vec<CartItem>> {
        let state = self.state.lock().await;
        Ok(state
            .cart
            .iter()
            .filter(|c| c.student_id == student_id)
            .filter_map(|c| {
                state.books.get(&c.book_id).map(|b| CartItem {
                    id: c.id,
                    book_id: b.id,
                    title: b.title.clone(),
                    author: b.author.clone(),
                    cover_image: b.cover_image.clone(),
                    added_at: c.created_at,
                })
            })
            .collect())
    }

    async fn clear(&self, student_id: Uuid) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.cart.len();
        state.cart.retain(|c| c.student_id != student_id);
        Ok((before - state.cart.len()) as u64)
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn get(&self, id: i32) -> AppResult<Option<Loan>> {
        Ok(self.state.lock().await.loans.get(&id).cloned())
    }

    async fn details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let state = self.state.lock().await;
        Ok(state.loans.get(&id).map(|l| state.details(l)))
    }

    async fn open(&self, loan: NewLoan) -> AppResult<Loan> {
        let mut state = self.state.lock().await;
        let book = state
            .books
            .get_mut(&loan.book_id)
            .ok_or(CirculationError::BookNotFound(loan.book_id))?;
        if book.available_stock <= 0 {
            return Err(CirculationError::OutOfStock(loan.book_id).into());
        }
        book.available_stock -= 1;

        let now = Utc::now();
        let created = Loan {
            id: state.next_id(),
            student_id: loan.student_id,
            book_id: loan.book_id,
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: None,
            status: LoanStatus::Borrowed,
            return_condition: None,
            fine_amount: 0,
            fine_kind: FineKind::None,
            note: loan.note,
            rating: None,
            created_at: now,
            updated_at: now,
        };
        state.loans.insert(created.id, created.clone());
        state.move_stock(created.book_id, Some(created.id), -1, StockReason::Loan);
        Ok(created)
    }

    async fn apply(&self, transition: &LoanTransition) -> AppResult<Loan> {
        let mut state = self.state.lock().await;
        let loan = state
            .loans
            .get_mut(&transition.loan_id)
            .filter(|l| l.status == transition.from && l.updated_at == transition.last_updated)
            .ok_or(CirculationError::ConcurrentUpdate(transition.loan_id))?;

        loan.status = transition.to;
        loan.return_date = transition.return_date;
        loan.return_condition = transition.return_condition;
        loan.fine_amount = transition.fine.amount;
        loan.fine_kind = transition.fine.kind;
        loan.note = transition.note.clone();
        loan.updated_at = Utc::now().max(loan.updated_at + Duration::microseconds(1));
        let updated = loan.clone();

        if transition.restock {
            if let Some(book) = state.books.get_mut(&transition.book_id) {
                if book.available_stock < book.total_copies {
                    book.available_stock += 1;
                    state.move_stock(transition.book_id, Some(updated.id), 1, StockReason::Return);
                }
            }
        }
        Ok(updated)
    }

    async fn rate(&self, id: i32, rating: i16) -> AppResult<Loan> {
        let mut state = self.state.lock().await;
        let loan = state
            .loans
            .get_mut(&id)
            .filter(|l| l.rating.is_none())
            .ok_or(CirculationError::AlreadyRated(id))?;
        loan.rating = Some(rating);
        Ok(loan.clone())
    }

    async fn search(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let (_, per_page, offset) = paging(query.page, query.per_page);
        let state = self.state.lock().await;
        let keyword = query.keyword.as_ref().map(|k| k.to_lowercase());
        let mut loans: Vec<LoanDetails> = state
            .loans
            .values()
            .map(|l| state.details(l))
            .filter(|d| query.status.map_or(true, |s| d.status == s))
            .filter(|d| {
                keyword.as_ref().map_or(true, |k| {
                    d.book_title.to_lowercase().contains(k) || d.student_name.to_lowercase().contains(k)
                })
            })
            .collect();

        loans.sort_by(|a, b| {
            let ord = match query.sort_by.unwrap_or_default() {
                LoanSortField::BorrowDate => a.borrow_date.cmp(&b.borrow_date),
                LoanSortField::DueDate => a.due_date.cmp(&b.due_date),
                LoanSortField::ReturnDate => a.return_date.cmp(&b.return_date),
                LoanSortField::Id => a.id.cmp(&b.id),
            }
            .then(a.id.cmp(&b.id));
            match query.direction.unwrap_or_default() {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let total = loans.len() as i64;
        let page = loans
            .into_iter()
            .skip(offset as usize)
            .take(per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn circulation_counts(&self) -> AppResult<(i64, i64)> {
        let state = self.state.lock().await;
        let open: Vec<&Loan> = state
            .loans
            .values()
            .filter(|l| l.status == LoanStatus::Borrowed)
            .collect();
        let mut borrowers: Vec<Uuid> = open
            .iter()
            .filter(|l| state.users.get(&l.student_id).is_some_and(|u| u.active))
            .map(|l| l.student_id)
            .collect();
        borrowers.sort();
        borrowers.dedup();
        Ok((open.len() as i64, borrowers.len() as i64))
    }

    async fn for_student(&self, student_id: Uuid) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;
        Ok(state
            .loans
            .values()
            .rev()
            .filter(|l| l.student_id == student_id)
            .map(|l| state.details(l))
            .collect())
    }

    async fn due_on(&self, date: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;
        Ok(state
            .loans
            .values()
            .filter(|l| l.status == LoanStatus::Borrowed && l.due_date == date)
            .map(|l| state.details(l))
            .collect())
    }

    async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;
        Ok(state
            .loans
            .values()
            .filter(|l| l.is_overdue(today))
            .map(|l| state.details(l))
            .collect())
    }
}
