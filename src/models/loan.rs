//! Loan (peminjaman) model and its lifecycle state machine
//!
//! A loan starts BORROWED, may wait in PENDING_CONFIRMATION after a student
//! returns it, and ends RETURNED. The methods on [`Loan`] only check guards and
//! describe the next state as a [`LoanTransition`]; the store applies it while
//! the loan is still in the state the decision was taken from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::enums::{FineKind, LoanStatus, ReturnCondition};
use crate::{config::SelfReturnPolicy, error::CirculationError};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub student_id: Uuid,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub return_condition: Option<ReturnCondition>,
    /// Currency minor units
    pub fine_amount: i64,
    pub fine_kind: FineKind,
    pub note: Option<String>,
    /// 1-5, written once by the borrower after the return
    pub rating: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fine amount with its category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Fine {
    pub amount: i64,
    pub kind: FineKind,
}

impl Fine {
    pub const NONE: Fine = Fine {
        amount: 0,
        kind: FineKind::None,
    };
}

/// A return as observed at the desk (or declared by the student)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnRecord {
    pub date: NaiveDate,
    pub condition: ReturnCondition,
    pub note: Option<String>,
    pub fine: Fine,
}

impl ReturnRecord {
    fn check_note(&self) -> Result<(), CirculationError> {
        if self.condition == ReturnCondition::Damaged && self.note.is_none() {
            return Err(CirculationError::NoteRequired);
        }
        Ok(())
    }
}

/// Trims a free-text note; blank notes count as absent
pub fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Next state of a loan, applied only while the stored row is still the
/// snapshot it was computed from (`from` status, `last_updated` stamp)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanTransition {
    pub loan_id: i32,
    pub book_id: i32,
    pub from: LoanStatus,
    pub last_updated: DateTime<Utc>,
    pub to: LoanStatus,
    pub return_date: Option<NaiveDate>,
    pub return_condition: Option<ReturnCondition>,
    pub fine: Fine,
    pub note: Option<String>,
    /// Put one copy back on the shelf
    pub restock: bool,
}

impl Loan {
    pub fn fine(&self) -> Fine {
        Fine {
            amount: self.fine_amount,
            kind: self.fine_kind,
        }
    }

    fn ensure_not_returned(&self) -> Result<(), CirculationError> {
        if self.status == LoanStatus::Returned {
            return Err(CirculationError::AlreadyReturned(self.id));
        }
        Ok(())
    }

    fn ensure_owned_by(&self, student_id: Uuid) -> Result<(), CirculationError> {
        if self.student_id != student_id {
            return Err(CirculationError::Forbidden(self.id));
        }
        Ok(())
    }

    fn returned_with(&self, record: ReturnRecord) -> LoanTransition {
        LoanTransition {
            loan_id: self.id,
            book_id: self.book_id,
            from: self.status,
            last_updated: self.updated_at,
            to: LoanStatus::Returned,
            return_date: Some(record.date),
            return_condition: Some(record.condition),
            fine: record.fine,
            note: record.note.or_else(|| self.note.clone()),
            restock: record.condition == ReturnCondition::Normal,
        }
    }

    /// Librarian closes the loan at the desk
    pub fn close(&self, record: ReturnRecord) -> Result<LoanTransition, CirculationError> {
        self.ensure_not_returned()?;
        record.check_note()?;
        Ok(self.returned_with(record))
    }

    /// Borrowing student hands the book back
    pub fn submit_return(
        &self,
        student_id: Uuid,
        record: ReturnRecord,
        policy: SelfReturnPolicy,
    ) -> Result<LoanTransition, CirculationError> {
        self.ensure_owned_by(student_id)?;
        self.ensure_not_returned()?;
        if self.status == LoanStatus::PendingConfirmation {
            return Err(CirculationError::AwaitingConfirmation(self.id));
        }
        record.check_note()?;

        match policy {
            SelfReturnPolicy::Immediate => Ok(self.returned_with(record)),
            SelfReturnPolicy::RequireConfirmation => Ok(LoanTransition {
                loan_id: self.id,
                book_id: self.book_id,
                from: self.status,
                last_updated: self.updated_at,
                to: LoanStatus::PendingConfirmation,
                return_date: Some(record.date),
                return_condition: Some(record.condition),
                fine: record.fine,
                note: record.note.or_else(|| self.note.clone()),
                restock: false,
            }),
        }
    }

    /// Librarian approves or rejects a pending student return
    pub fn decide_return(
        &self,
        approve: bool,
        note: Option<String>,
    ) -> Result<LoanTransition, CirculationError> {
        if self.status != LoanStatus::PendingConfirmation {
            return Err(CirculationError::NotAwaitingConfirmation(self.id));
        }
        let note = note.or_else(|| self.note.clone());

        if approve {
            return Ok(LoanTransition {
                loan_id: self.id,
                book_id: self.book_id,
                from: self.status,
                last_updated: self.updated_at,
                to: LoanStatus::Returned,
                return_date: self.return_date,
                return_condition: self.return_condition,
                fine: self.fine(),
                note,
                restock: self.return_condition == Some(ReturnCondition::Normal),
            });
        }

        // Rejected: the loan is open again, nothing of the provisional return survives
        Ok(LoanTransition {
            loan_id: self.id,
            book_id: self.book_id,
            from: self.status,
            last_updated: self.updated_at,
            to: LoanStatus::Borrowed,
            return_date: None,
            return_condition: None,
            fine: Fine::NONE,
            note,
            restock: false,
        })
    }

    /// Checks that `student_id` may set `rating` on this loan
    pub fn check_rating(&self, student_id: Uuid, rating: i16) -> Result<(), CirculationError> {
        if self.status != LoanStatus::Returned {
            return Err(CirculationError::NotYetReturned(self.id));
        }
        self.ensure_owned_by(student_id)?;
        if !(1..=5).contains(&rating) {
            return Err(CirculationError::InvalidRating(rating));
        }
        if self.rating.is_some() {
            return Err(CirculationError::AlreadyRated(self.id));
        }
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == LoanStatus::Borrowed && today > self.due_date
    }
}

/// Loan row to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub student_id: Uuid,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub note: Option<String>,
}

/// Loan with student and book display fields
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub student_id: Uuid,
    pub student_name: String,
    pub book_id: i32,
    pub book_title: String,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub return_condition: Option<ReturnCondition>,
    pub fine_amount: i64,
    pub fine_kind: FineKind,
    pub note: Option<String>,
    pub rating: Option<i16>,
    #[sqlx(default)]
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn flag_overdue(mut self, today: NaiveDate) -> Self {
        self.is_overdue = self.status == LoanStatus::Borrowed && today > self.due_date;
        self
    }
}

/// Sortable loan columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanSortField {
    #[default]
    BorrowDate,
    DueDate,
    ReturnDate,
    Id,
}

impl LoanSortField {
    pub fn column(&self) -> &'static str {
        match self {
            LoanSortField::BorrowDate => "l.borrow_date",
            LoanSortField::DueDate => "l.due_date",
            LoanSortField::ReturnDate => "l.return_date",
            LoanSortField::Id => "l.id",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Loan listing parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// Matches book title or student name, case-insensitive
    pub keyword: Option<String>,
    pub status: Option<LoanStatus>,
    pub sort_by: Option<LoanSortField>,
    pub direction: Option<SortDirection>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One page of the librarian loan listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanPage {
    pub items: Vec<LoanDetails>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    /// Loans currently BORROWED
    pub total_borrowed: i64,
    /// Distinct active students holding a BORROWED loan
    pub active_borrowers: i64,
}

/// Open loan past its due date
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueLoan {
    pub loan: LoanDetails,
    pub days_late: i64,
    /// Late fine if the book came back today in normal condition
    pub projected_fine: i64,
}

/// Manual loan request (librarian)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateManualLoan {
    pub student_id: Uuid,
    pub book_id: i32,
    /// Defaults to today
    pub borrow_date: Option<NaiveDate>,
    /// Defaults to the borrow date plus the loan period
    pub due_date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Return request, used for both desk and self-service returns
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnLoanRequest {
    pub condition: ReturnCondition,
    /// Required when the condition is DAMAGED
    pub note: Option<String>,
}

/// Librarian decision on a pending student return
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConfirmReturnRequest {
    pub approve: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RateLoanRequest {
    pub rating: i16,
}

/// Direct borrow by a student, bypassing the cart
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SelfBorrowRequest {
    pub book_id: i32,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct DueSoonQuery {
    /// Due date to look for (default tomorrow)
    pub date: Option<NaiveDate>,
}
