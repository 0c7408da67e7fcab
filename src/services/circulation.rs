//! Loan lifecycle service: borrowing, returns, confirmations and ratings

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use super::{
    access::{authorize, resolve},
    clock::Clock,
    fines::{days_late, FinePolicy},
};
use crate::{
    config::CirculationConfig,
    error::{AppResult, CirculationError},
    models::{
        enums::{ReturnCondition, Role},
        loan::{
            clean_note, ConfirmReturnRequest, CreateManualLoan, Loan, LoanDetails, LoanPage,
            LoanQuery, LoanTransition, NewLoan, OverdueLoan, ReturnLoanRequest, ReturnRecord,
        },
        policy::{self, Operation},
    },
    repository::{paging, Catalog, LoanStore, UserDirectory},
};

#[derive(Clone)]
pub struct CirculationService {
    users: Arc<dyn UserDirectory>,
    books: Arc<dyn Catalog>,
    loans: Arc<dyn LoanStore>,
    clock: Arc<dyn Clock>,
    fines: FinePolicy,
    settings: CirculationConfig,
}

impl CirculationService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        books: Arc<dyn Catalog>,
        loans: Arc<dyn LoanStore>,
        clock: Arc<dyn Clock>,
        settings: CirculationConfig,
    ) -> Self {
        Self {
            users,
            books,
            loans,
            clock,
            fines: FinePolicy::from(&settings),
            settings,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Due date for a loan starting on `borrow_date`; `InvalidDates` past the calendar's end
    pub fn due_date(&self, borrow_date: NaiveDate) -> AppResult<NaiveDate> {
        borrow_date
            .checked_add_signed(Duration::days(self.settings.loan_period_days))
            .ok_or_else(|| CirculationError::InvalidDates.into())
    }

    /// Take a copy off the shelf and record the loan. Callers have already
    /// checked the policy for the operation they serve.
    pub(crate) async fn open_loan(&self, loan: NewLoan) -> AppResult<Loan> {
        let created = self.loans.open(loan).await?;
        tracing::info!(
            loan_id = created.id,
            student_id = %created.student_id,
            book_id = created.book_id,
            due_date = %created.due_date,
            "Loan opened"
        );
        Ok(created)
    }

    async fn loan(&self, id: i32) -> AppResult<Loan> {
        self.loans
            .get(id)
            .await?
            .ok_or_else(|| CirculationError::NotFound(id).into())
    }

    fn return_record(&self, loan: &Loan, request: ReturnLoanRequest) -> ReturnRecord {
        let date = self.today();
        ReturnRecord {
            date,
            condition: request.condition,
            note: clean_note(request.note),
            fine: self.fines.compute(loan.due_date, date, request.condition),
        }
    }

    async fn apply(&self, transition: LoanTransition) -> AppResult<Loan> {
        let loan = self.loans.apply(&transition).await?;
        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            from = %transition.from,
            to = %transition.to,
            fine = transition.fine.amount,
            fine_kind = %transition.fine.kind,
            restock = transition.restock,
            "Loan status changed"
        );
        Ok(loan)
    }

    /// Librarian lends a book at the desk
    pub async fn create_manual(&self, actor: Uuid, request: CreateManualLoan) -> AppResult<Loan> {
        authorize(self.users.as_ref(), actor, Operation::CreateManualLoan).await?;

        self.users
            .get(request.student_id)
            .await?
            .filter(|u| u.role == Role::Student)
            .ok_or_else(|| CirculationError::StudentNotFound(request.student_id.to_string()))?;
        self.books
            .get(request.book_id)
            .await?
            .ok_or(CirculationError::BookNotFound(request.book_id))?;

        let borrow_date = request.borrow_date.unwrap_or_else(|| self.today());
        let due_date = match request.due_date {
            Some(due_date) => due_date,
            None => self.due_date(borrow_date)?,
        };
        if due_date < borrow_date {
            return Err(CirculationError::InvalidDates.into());
        }

        let note = clean_note(request.note).or_else(|| Some(self.settings.default_note.clone()));
        self.open_loan(NewLoan {
            student_id: request.student_id,
            book_id: request.book_id,
            borrow_date,
            due_date,
            note,
        })
        .await
    }

    /// Student borrows one book directly, without the cart
    pub async fn self_borrow(&self, actor: Uuid, book_id: i32) -> AppResult<Loan> {
        authorize(self.users.as_ref(), actor, Operation::SelfBorrow).await?;

        let today = self.today();
        let due_date = self.due_date(today)?;
        self.open_loan(NewLoan {
            student_id: actor,
            book_id,
            borrow_date: today,
            due_date,
            note: None,
        })
        .await
    }

    /// Librarian closes a loan at the desk
    pub async fn manual_return(&self, actor: Uuid, loan_id: i32, request: ReturnLoanRequest) -> AppResult<Loan> {
        authorize(self.users.as_ref(), actor, Operation::ManualReturn).await?;

        let loan = self.loan(loan_id).await?;
        let record = self.return_record(&loan, request);
        self.apply(loan.close(record)?).await
    }

    /// Student returns their own loan; closed directly or left for confirmation
    /// depending on `circulation.self_return`
    pub async fn self_return(&self, actor: Uuid, loan_id: i32, request: ReturnLoanRequest) -> AppResult<Loan> {
        authorize(self.users.as_ref(), actor, Operation::SelfReturn).await?;

        let loan = self.loan(loan_id).await?;
        let record = self.return_record(&loan, request);
        self.apply(loan.submit_return(actor, record, self.settings.self_return)?)
            .await
    }

    pub async fn confirm_return(&self, actor: Uuid, loan_id: i32, request: ConfirmReturnRequest) -> AppResult<Loan> {
        authorize(self.users.as_ref(), actor, Operation::ConfirmReturn).await?;

        let loan = self.loan(loan_id).await?;
        let transition = loan.decide_return(request.approve, clean_note(request.note))?;
        self.apply(transition).await
    }

    pub async fn rate(&self, actor: Uuid, loan_id: i32, rating: i16) -> AppResult<Loan> {
        authorize(self.users.as_ref(), actor, Operation::RateLoan).await?;

        let loan = self.loan(loan_id).await?;
        loan.check_rating(actor, rating)?;

        let rated = self.loans.rate(loan_id, rating).await?;
        tracing::info!(loan_id, book_id = rated.book_id, rating, "Loan rated");
        Ok(rated)
    }

    /// Librarian listing with header totals
    pub async fn list(&self, actor: Uuid, query: &LoanQuery) -> AppResult<LoanPage> {
        authorize(self.users.as_ref(), actor, Operation::ListLoans).await?;

        let (page, per_page, _) = paging(query.page, query.per_page);
        let (items, total) = self.loans.search(query).await?;
        let (total_borrowed, active_borrowers) = self.loans.circulation_counts().await?;
        let today = self.today();

        Ok(LoanPage {
            items: items.into_iter().map(|l| l.flag_overdue(today)).collect(),
            total,
            page,
            per_page,
            total_borrowed,
            active_borrowers,
        })
    }

    /// Caller's own loans, newest first
    pub async fn mine(&self, actor: Uuid) -> AppResult<Vec<LoanDetails>> {
        authorize(self.users.as_ref(), actor, Operation::ViewOwnLoans).await?;
        let today = self.today();
        let loans = self.loans.for_student(actor).await?;
        Ok(loans.into_iter().map(|l| l.flag_overdue(today)).collect())
    }

    /// One loan; students only see their own
    pub async fn get(&self, actor: Uuid, loan_id: i32) -> AppResult<LoanDetails> {
        let principal = resolve(self.users.as_ref(), actor).await?;
        let loan = self
            .loans
            .details(loan_id)
            .await?
            .ok_or(CirculationError::NotFound(loan_id))?;

        let staff_view = policy::is_allowed(Operation::ListLoans, principal.role);
        let own_view = policy::is_allowed(Operation::ViewOwnLoans, principal.role)
            && loan.student_id == principal.id;
        if !staff_view && !own_view {
            return Err(CirculationError::Forbidden(loan_id).into());
        }

        Ok(loan.flag_overdue(self.today()))
    }

    /// Open loans due on `date`, tomorrow by default
    pub async fn due_soon(&self, actor: Uuid, date: Option<NaiveDate>) -> AppResult<Vec<LoanDetails>> {
        authorize(self.users.as_ref(), actor, Operation::ListLoans).await?;
        let date = match date {
            Some(date) => date,
            None => self
                .today()
                .succ_opt()
                .ok_or(CirculationError::InvalidDates)?,
        };
        self.loans.due_on(date).await
    }

    /// Open loans past due, with the late fine they would carry if returned today
    pub async fn overdue(&self, actor: Uuid) -> AppResult<Vec<OverdueLoan>> {
        authorize(self.users.as_ref(), actor, Operation::ListLoans).await?;

        let today = self.today();
        let loans = self.loans.overdue(today).await?;
        Ok(loans
            .into_iter()
            .map(|loan| {
                let fine = self.fines.compute(loan.due_date, today, ReturnCondition::Normal);
                OverdueLoan {
                    days_late: days_late(loan.due_date, today),
                    projected_fine: fine.amount,
                    loan: loan.flag_overdue(today),
                }
            })
            .collect())
    }
}
