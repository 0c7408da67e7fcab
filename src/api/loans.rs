//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{
        ConfirmReturnRequest, CreateManualLoan, DueSoonQuery, Loan, LoanDetails, LoanPage, LoanQuery,
        OverdueLoan, RateLoanRequest, ReturnLoanRequest, SelfBorrowRequest,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Librarian loan listing with totals
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Page of loans", body = LoanPage),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<LoanPage>> {
    let page = state.services.circulation.list(claims.user_id, &query).await?;
    Ok(Json(page))
}

/// Record a loan at the desk
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateManualLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Due date before borrow date"),
        (status = 404, description = "Student or book not found"),
        (status = 422, description = "No copy available")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateManualLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state.services.circulation.create_manual(claims.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Borrow one book directly
#[utoipa::path(
    post,
    path = "/loans/self",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = SelfBorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 404, description = "Book not found"),
        (status = 422, description = "No copy available")
    )
)]
pub async fn self_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<SelfBorrowRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state.services.circulation.self_borrow(claims.user_id, request.book_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Caller's own loans
#[utoipa::path(
    get,
    path = "/loans/mine",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own loans, newest first", body = Vec<LoanDetails>)
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.circulation.mine(claims.user_id).await?;
    Ok(Json(loans))
}

/// Open loans due on a given day
#[utoipa::path(
    get,
    path = "/loans/due-soon",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(DueSoonQuery),
    responses(
        (status = 200, description = "Open loans due that day", body = Vec<LoanDetails>)
    )
)]
pub async fn due_soon(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<DueSoonQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.circulation.due_soon(claims.user_id, query.date).await?;
    Ok(Json(loans))
}

/// Open loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans with projected fines", body = Vec<OverdueLoan>)
    )
)]
pub async fn overdue_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    let loans = state.services.circulation.overdue(claims.user_id).await?;
    Ok(Json(loans))
}

/// Get loan details
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 403, description = "Loan belongs to another student"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.circulation.get(claims.user_id, id).await?;
    Ok(Json(loan))
}

/// Return a book at the desk
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Loan returned", body = Loan),
        (status = 400, description = "Damaged return without a note"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ReturnLoanRequest>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.manual_return(claims.user_id, id, request).await?;
    Ok(Json(loan))
}

/// Submit a return as the borrowing student
#[utoipa::path(
    post,
    path = "/loans/{id}/self-return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Return recorded or awaiting confirmation", body = Loan),
        (status = 403, description = "Loan belongs to another student"),
        (status = 409, description = "Loan already returned or awaiting confirmation")
    )
)]
pub async fn self_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ReturnLoanRequest>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.self_return(claims.user_id, id, request).await?;
    Ok(Json(loan))
}

/// Approve or reject a pending student return
#[utoipa::path(
    post,
    path = "/loans/{id}/confirm",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ConfirmReturnRequest,
    responses(
        (status = 200, description = "Decision applied", body = Loan),
        (status = 409, description = "Loan is not awaiting confirmation")
    )
)]
pub async fn confirm_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ConfirmReturnRequest>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.confirm_return(claims.user_id, id, request).await?;
    Ok(Json(loan))
}

/// Rate a returned book
#[utoipa::path(
    post,
    path = "/loans/{id}/rating",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = RateLoanRequest,
    responses(
        (status = 200, description = "Rating recorded", body = Loan),
        (status = 400, description = "Rating outside 1..5"),
        (status = 409, description = "Not returned yet or already rated")
    )
)]
pub async fn rate_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<RateLoanRequest>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.rate(claims.user_id, id, request.rating).await?;
    Ok(Json(loan))
}
