//! Report endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::report::{LateStudent, LoanTrendQuery, PeriodCount, ReportPeriod, SummaryReport, TitleCount, TitleRating},
    AppState,
};

use super::AuthenticatedUser;

/// Circulation summary
#[utoipa::path(
    get,
    path = "/reports/summary",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Counts by status and fines total", body = SummaryReport),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SummaryReport>> {
    let report = state.services.reports.summary(claims.user_id).await?;
    Ok(Json(report))
}

/// Most borrowed titles
#[utoipa::path(
    get,
    path = "/reports/most-borrowed",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportPeriod),
    responses(
        (status = 200, description = "Titles by loan count", body = Vec<TitleCount>)
    )
)]
pub async fn most_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(period): Query<ReportPeriod>,
) -> AppResult<Json<Vec<TitleCount>>> {
    let rows = state.services.reports.most_borrowed(claims.user_id, &period).await?;
    Ok(Json(rows))
}

/// Students with the most late returns
#[utoipa::path(
    get,
    path = "/reports/late-students",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportPeriod),
    responses(
        (status = 200, description = "Students by late returns", body = Vec<LateStudent>)
    )
)]
pub async fn late_students(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(period): Query<ReportPeriod>,
) -> AppResult<Json<Vec<LateStudent>>> {
    let rows = state.services.reports.late_students(claims.user_id, &period).await?;
    Ok(Json(rows))
}

/// Average rating per title
#[utoipa::path(
    get,
    path = "/reports/top-rated",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportPeriod),
    responses(
        (status = 200, description = "Titles by average rating", body = Vec<TitleRating>)
    )
)]
pub async fn top_rated(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(period): Query<ReportPeriod>,
) -> AppResult<Json<Vec<TitleRating>>> {
    let rows = state.services.reports.top_rated(claims.user_id, &period).await?;
    Ok(Json(rows))
}

/// Loan counts grouped by period
#[utoipa::path(
    get,
    path = "/reports/loans",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(LoanTrendQuery),
    responses(
        (status = 200, description = "Loans per period", body = Vec<PeriodCount>)
    )
)]
pub async fn loans_per_period(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanTrendQuery>,
) -> AppResult<Json<Vec<PeriodCount>>> {
    let rows = state.services.reports.loans_per_period(claims.user_id, &query).await?;
    Ok(Json(rows))
}
